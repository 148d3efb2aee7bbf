//! Engine error type shared by the grid, pathfinder, knowledge and session modules

use crate::models::{CellState, Coord, TraversalPolicy};

/// Errors returned by engine operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Coordinate {coord} is outside the {rows}x{cols} grid")]
    OutOfBounds {
        coord: Coord,
        rows: usize,
        cols: usize,
    },

    #[error("No {policy} path from {from} to {to}")]
    Unreachable {
        from: Coord,
        to: Coord,
        policy: TraversalPolicy,
    },

    #[error("Cell {coord} is known to be {known}, cannot record it as {observed}")]
    Contradiction {
        coord: Coord,
        known: CellState,
        observed: CellState,
    },

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid knowledge: {0}")]
    InvalidKnowledge(String),

    #[error("Unsupported knowledge format: {0}")]
    UnsupportedVersion(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
