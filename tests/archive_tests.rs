// Integration tests for the maze archive and CLI commands
// Tests maze storage, knowledge persistence, and session history

use anyhow::Result;
use mazekeeper::commands::{self, GenerateArgs, KnowledgeOperation, SolveArgs};
use mazekeeper::config::MazePaths;
use mazekeeper::db::Database;
use mazekeeper::grid::Grid;
use mazekeeper::knowledge::KnowledgeStore;
use mazekeeper::models::{CellState, Coord, TraversalPolicy};
use mazekeeper::session::{Outcome, Session, SessionState};
use std::fs;
use tempfile::TempDir;

/// Setup test environment
fn setup() -> Result<(TempDir, MazePaths, Database)> {
    let temp_dir = TempDir::new()?;
    let paths = MazePaths::at(temp_dir.path());
    paths.ensure_dirs()?;
    let db = Database::init(&paths)?;
    Ok((temp_dir, paths, db))
}

#[test]
fn test_maze_round_trip() -> Result<()> {
    let (_temp, _paths, db) = setup()?;
    let grid = Grid::parse("S.#K\n...G\n")?;

    db.save_maze("corridor", &grid)?;
    assert_eq!(db.get_maze("corridor")?, Some(grid));
    assert_eq!(db.get_maze("missing")?, None);

    let mazes = db.list_mazes()?;
    assert_eq!(mazes.len(), 1);
    assert_eq!(mazes[0].id, "corridor");
    assert_eq!((mazes[0].rows, mazes[0].cols, mazes[0].keys), (2, 4, 1));
    assert_eq!(mazes[0].known_cells, None);
    Ok(())
}

#[test]
fn test_invalid_maze_id_is_rejected() -> Result<()> {
    let (_temp, _paths, db) = setup()?;
    let grid = Grid::parse("SG\n")?;
    assert!(db.save_maze("Not Valid", &grid).is_err());
    assert!(db.list_mazes()?.is_empty());
    Ok(())
}

#[test]
fn test_knowledge_persists() -> Result<()> {
    let (_temp, _paths, db) = setup()?;
    let grid = Grid::parse("S..\n.#.\n..G\n")?;
    db.save_maze("ring", &grid)?;
    assert!(db.load_knowledge("ring")?.is_none());

    let mut store = KnowledgeStore::new();
    store.mark_visited(Coord::new(0, 0))?;
    store.observe(Coord::new(1, 1), CellState::Wall)?;
    db.save_knowledge("ring", &store.snapshot())?;

    let loaded = db.load_knowledge("ring")?.unwrap();
    assert_eq!(loaded, store.snapshot());
    assert_eq!(db.list_mazes()?[0].known_cells, Some(2));
    Ok(())
}

#[test]
fn test_replacing_a_maze_drops_its_knowledge() -> Result<()> {
    let (_temp, _paths, db) = setup()?;
    db.save_maze("swap", &Grid::parse("S.G\n")?)?;

    let mut store = KnowledgeStore::new();
    store.observe(Coord::new(0, 1), CellState::Open)?;
    db.save_knowledge("swap", &store.snapshot())?;

    // Saving the same layout again keeps what was learned
    db.save_maze("swap", &Grid::parse("S.G\n")?)?;
    assert!(db.load_knowledge("swap")?.is_some());

    db.save_maze("swap", &Grid::parse("S#G\n..K\n")?)?;
    assert!(db.load_knowledge("swap")?.is_none());
    Ok(())
}

#[test]
fn test_session_history() -> Result<()> {
    let (_temp, _paths, mut db) = setup()?;
    let grid = Grid::parse("S..\n##.\n..G\n")?;
    db.save_maze("bend", &grid)?;

    let mut session = Session::create(grid, None, TraversalPolicy::Optimistic)?;
    session.run(1_000)?;
    db.record_session("bend", &session)?;

    let sessions = db.list_sessions("bend")?;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, session.id().to_string());
    assert_eq!(sessions[0].policy, "optimistic");
    assert_eq!(sessions[0].moves, session.moves());
    assert!(sessions[0].outcome.starts_with("finished (success"));

    let events = db.session_events(&sessions[0].id)?;
    assert_eq!(events.len(), session.events().len());
    assert_eq!(events.first().map(String::as_str), Some("started:0,0"));
    assert_eq!(events.last().map(String::as_str), Some("success:4"));
    Ok(())
}

#[test]
fn test_commands_require_init() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let paths = MazePaths::at(temp_dir.path());
    assert!(commands::check(&paths, "anything").is_err());
    Ok(())
}

#[test]
fn test_generate_solve_and_export() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let paths = MazePaths::at(temp_dir.path());
    commands::init(&paths)?;
    assert!(paths.is_initialized());

    let args = GenerateArgs {
        seed: Some(11),
        rows: Some(12),
        cols: Some(12),
        keys: Some(2),
        from: None,
    };
    let grid = commands::generate_maze(&paths, "small", &args)?;
    let warnings = commands::check(&paths, "small")?;
    assert!(!warnings.iter().any(|w| w.contains("unreachable")), "{:?}", warnings);

    let state = commands::solve(&paths, "small", &SolveArgs::default())?;
    assert!(matches!(state, SessionState::Finished(Outcome::Success { .. })));

    // The second run starts from what the first one learned
    let careful = SolveArgs {
        policy: Some("conservative".to_string()),
        ..SolveArgs::default()
    };
    let state = commands::solve(&paths, "small", &careful)?;
    assert!(matches!(state, SessionState::Finished(Outcome::Success { .. })));

    let db = Database::open(&paths)?;
    assert_eq!(db.list_sessions("small")?.len(), 2);
    assert_eq!(db.get_maze("small")?, Some(grid));

    commands::knowledge(
        &paths,
        KnowledgeOperation::Export {
            id: "small".to_string(),
            output: None,
        },
    )?;
    let exported = paths.exports.join("small.json");
    assert!(fs::read_to_string(&exported)?.contains("mazekeeper://knowledge/v1"));

    commands::knowledge(
        &paths,
        KnowledgeOperation::Import {
            id: "small".to_string(),
            file: exported,
        },
    )?;
    Ok(())
}

#[test]
fn test_import_rejects_knowledge_outside_the_maze() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let paths = MazePaths::at(temp_dir.path());
    commands::init(&paths)?;

    let layout = temp_dir.path().join("tiny.txt");
    fs::write(&layout, "S.\n.G\n")?;
    commands::generate_maze(
        &paths,
        "tiny",
        &GenerateArgs {
            from: Some(layout),
            ..GenerateArgs::default()
        },
    )?;

    let file = temp_dir.path().join("far.json");
    fs::write(
        &file,
        r#"{"$schema": "mazekeeper://knowledge/v1", "cells": {"9,9": "open"}}"#,
    )?;
    let result = commands::knowledge(
        &paths,
        KnowledgeOperation::Import {
            id: "tiny".to_string(),
            file,
        },
    );
    assert!(result.is_err());
    Ok(())
}
