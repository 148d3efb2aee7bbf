//! Mazekeeper - a maze exploration engine that remembers what it has learned

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod grid;
pub mod knowledge;
pub mod models;
pub mod pathfinder;
pub mod session;
pub mod validation;
