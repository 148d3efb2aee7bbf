//! CLI commands for mazekeeper

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::config::{load_config, save_config, Config, MazePaths};
use crate::db::Database;
use crate::error::EngineError;
use crate::grid::{generate, Grid};
use crate::knowledge::export;
use crate::models::{Coord, TraversalPolicy};
use crate::session::{Session, SessionState};
use crate::validation::{coverage, lint_grid, validate_maze_id};

/// Where a new maze comes from
#[derive(Debug, Clone, Default)]
pub struct GenerateArgs {
    pub seed: Option<u64>,
    pub rows: Option<usize>,
    pub cols: Option<usize>,
    pub keys: Option<usize>,
    /// Text layout to load instead of generating
    pub from: Option<PathBuf>,
}

/// Overrides for a solve run
#[derive(Debug, Clone, Default)]
pub struct SolveArgs {
    pub policy: Option<String>,
    pub max_steps: Option<usize>,
    /// Ignore archived knowledge
    pub fresh: bool,
    /// Print the maze with the walked trail
    pub show: bool,
}

/// Knowledge subcommands
#[derive(Debug, Clone)]
pub enum KnowledgeOperation {
    Export { id: String, output: Option<PathBuf> },
    Import { id: String, file: PathBuf },
    List,
}

/// Initialize mazekeeper for first-time setup
pub fn init(paths: &MazePaths) -> Result<()> {
    if paths.is_initialized() {
        println!("Mazekeeper is already initialized at {}", paths.root.display());
        return Ok(());
    }

    println!("Initializing mazekeeper at {}...", paths.root.display());

    paths.ensure_dirs()?;
    println!("  Created directory structure");

    if !paths.config.exists() {
        save_config(paths, &Config::default())?;
        println!("  Created config.toml");
    }

    Database::init(paths)?;
    println!("  Created maze archive");

    println!();
    println!("Mazekeeper initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  mazekeeper generate <maze-id>   Create a random maze");
    println!("  mazekeeper solve <maze-id>      Explore it");

    Ok(())
}

/// Create a maze and store it in the archive
pub fn generate_maze(paths: &MazePaths, id: &str, args: &GenerateArgs) -> Result<Grid> {
    ensure_initialized(paths)?;
    validate_maze_id(id)?;
    let config = load_config(paths)?;

    let grid = match &args.from {
        Some(file) => {
            let text = fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            Grid::parse(&text).with_context(|| format!("Invalid maze in {}", file.display()))?
        }
        None => {
            let mut options = config.generator.options(args.seed);
            if let Some(rows) = args.rows {
                options.rows = rows;
            }
            if let Some(cols) = args.cols {
                options.cols = cols;
            }
            if let Some(keys) = args.keys {
                options.keys = keys;
            }
            generate::generate(&options).context("Failed to generate maze")?
        }
    };

    let db = Database::open(paths)?;
    db.save_maze(id, &grid)?;
    tracing::info!(maze = id, rows = grid.rows(), cols = grid.cols(), "maze saved");

    println!("Created maze: {}", id);
    println!("  Size:  {}x{}", grid.rows(), grid.cols());
    println!("  Start: {}", grid.start());
    println!("  Goal:  {}", grid.goal());
    println!("  Keys:  {}", grid.keys().len());
    println!();
    print!("{}", grid);

    Ok(grid)
}

/// Lint a stored maze and report how much of it is known
pub fn check(paths: &MazePaths, id: &str) -> Result<Vec<String>> {
    ensure_initialized(paths)?;
    let db = Database::open(paths)?;
    let grid = load_grid(&db, id)?;

    let warnings = lint_grid(&grid);
    if warnings.is_empty() {
        println!("✓ {} has no issues", id);
    } else {
        println!("⚠ {} warning(s) for {}:", warnings.len(), id);
        for warning in &warnings {
            println!("  - {}", warning);
        }
    }

    if let Some(knowledge) = db.load_knowledge(id)? {
        println!();
        println!("Knowledge:");
        println!("  Coverage:  {:.1}%", coverage(&grid, &knowledge) * 100.0);
        println!("  Visited:   {}", knowledge.visited().count());
        println!("  Dead ends: {}", knowledge.dead_ends(&grid).len());
    }

    Ok(warnings)
}

/// Run one exploration session over a stored maze
pub fn solve(paths: &MazePaths, id: &str, args: &SolveArgs) -> Result<SessionState> {
    ensure_initialized(paths)?;
    let config = load_config(paths)?;
    let mut db = Database::open(paths)?;
    let grid = load_grid(&db, id)?;

    let policy = match &args.policy {
        Some(p) => p.parse::<TraversalPolicy>().map_err(|e| anyhow::anyhow!(e))?,
        None => config.planner.policy,
    };
    let max_steps = args.max_steps.unwrap_or(config.session.max_steps);

    let start_knowledge = if args.fresh {
        None
    } else {
        db.load_knowledge(id)?
    };
    let resumed = start_knowledge.as_ref().map(|k| k.len()).unwrap_or(0);

    let mut session = Session::create(grid, start_knowledge, policy)
        .with_context(|| format!("Archived knowledge does not fit maze {}", id))?;

    println!("Solving {} ({} policy)", id, policy);
    if resumed > 0 {
        println!("  Resuming with {} known cell(s)", resumed);
    }

    let mut resets = 0;
    loop {
        match session.run(max_steps).map(|_| ()) {
            Ok(()) => break,
            Err(EngineError::Contradiction { coord, .. }) => {
                resets += 1;
                if resets > session.grid().rows() * session.grid().cols() {
                    bail!("Knowledge for {} keeps contradicting the maze", id);
                }
                session.reset_knowledge(coord)?;
                println!("  Forgot stale knowledge at {}", coord);
            }
            Err(err) => return Err(err).context("Session failed"),
        }
    }

    db.record_session(id, &session)?;
    db.save_knowledge(id, &session.knowledge())?;

    let state = session.state().clone();
    match &state {
        SessionState::Finished(_) => println!("  Outcome: {}", state),
        other => println!("  Stopped after {} steps while {}", max_steps, other),
    }
    println!("  Moves:   {}", session.moves());
    println!(
        "  Keys:    {}/{}",
        session.keys_collected().count(),
        session.grid().keys().len()
    );
    println!("  Session: {}", session.id());

    if args.show {
        println!();
        print!("{}", render_trail(session.grid(), session.trail()));
    }

    Ok(state)
}

/// Export, import or list archived knowledge
pub fn knowledge(paths: &MazePaths, operation: KnowledgeOperation) -> Result<()> {
    ensure_initialized(paths)?;
    let db = Database::open(paths)?;

    match operation {
        KnowledgeOperation::Export { id, output } => {
            let knowledge = db
                .load_knowledge(&id)?
                .with_context(|| format!("No knowledge archived for {}", id))?;
            let text = export::export(&knowledge)?;

            let output = output.unwrap_or_else(|| paths.exports.join(format!("{}.json", id)));
            fs::write(&output, text)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            println!("✓ Exported {} known cell(s) to {}", knowledge.len(), output.display());
        }
        KnowledgeOperation::Import { id, file } => {
            let grid = load_grid(&db, &id)?;
            let knowledge = read_knowledge(&file)?;
            knowledge
                .check_bounds(&grid)
                .with_context(|| format!("{} does not fit maze {}", file.display(), id))?;
            db.save_knowledge(&id, &knowledge)?;

            println!("✓ Imported {} known cell(s) for {}", knowledge.len(), id);
        }
        KnowledgeOperation::List => {
            let mazes = db.list_mazes()?;
            if mazes.is_empty() {
                println!("No mazes found.");
                println!("Create one with: mazekeeper generate <maze-id>");
                return Ok(());
            }

            println!(
                "{:<24} {:<10} {:<6} {:<8} {:<20}",
                "MAZE", "SIZE", "KEYS", "KNOWN", "UPDATED"
            );
            println!("{}", "-".repeat(70));
            for maze in mazes {
                let known = maze
                    .known_cells
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<24} {:<10} {:<6} {:<8} {:<20}",
                    truncate(&maze.id, 22),
                    format!("{}x{}", maze.rows, maze.cols),
                    maze.keys,
                    known,
                    format_timestamp(maze.updated_at)
                );
            }
        }
    }

    Ok(())
}

/// Show recorded sessions for a maze, or the events of one session
pub fn history(paths: &MazePaths, id: &str, session: Option<&str>) -> Result<()> {
    ensure_initialized(paths)?;
    let db = Database::open(paths)?;

    if let Some(session_id) = session {
        let events = db.session_events(session_id)?;
        if events.is_empty() {
            bail!("No events recorded for session {}", session_id);
        }
        println!("Session {}", session_id);
        for (seq, event) in events.iter().enumerate() {
            println!("  {:>5}  {}", seq, event);
        }
        return Ok(());
    }

    let sessions = db.list_sessions(id)?;
    if sessions.is_empty() {
        println!("No sessions recorded for {}.", id);
        return Ok(());
    }

    println!(
        "{:<38} {:<13} {:<7} {:<20} OUTCOME",
        "SESSION", "POLICY", "MOVES", "RECORDED"
    );
    println!("{}", "-".repeat(100));
    for row in sessions {
        println!(
            "{:<38} {:<13} {:<7} {:<20} {}",
            row.id,
            row.policy,
            row.moves,
            format_timestamp(row.recorded_at),
            truncate(&row.outcome, 40)
        );
    }

    Ok(())
}

/// Draw the maze with walked cells marked `*`
pub fn render_trail(grid: &Grid, trail: &[Coord]) -> String {
    let mut out = String::new();
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            let coord = Coord::new(row, col);
            let ch = if coord == grid.start() {
                'S'
            } else if coord == grid.goal() {
                'G'
            } else if grid.keys().contains(&coord) {
                'K'
            } else if trail.contains(&coord) {
                '*'
            } else if grid.cell_at(coord).map(|c| c.is_wall()).unwrap_or(true) {
                '#'
            } else {
                '.'
            };
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

fn load_grid(db: &Database, id: &str) -> Result<Grid> {
    db.get_maze(id)?
        .with_context(|| format!("Maze not found: {}", id))
}

fn read_knowledge(file: &Path) -> Result<crate::knowledge::Knowledge> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    export::import(&text).with_context(|| format!("Invalid knowledge file {}", file.display()))
}

/// Ensure mazekeeper is initialized
fn ensure_initialized(paths: &MazePaths) -> Result<()> {
    if !paths.is_initialized() {
        bail!("Mazekeeper is not initialized. Run 'mazekeeper init' first.");
    }
    Ok(())
}

/// Format a Unix timestamp as a human-readable string
fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Truncate a string to a maximum length
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
