//! Validation for maze ids and lint checks for grids

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::grid::Grid;
use crate::knowledge::Knowledge;
use crate::models::TraversalPolicy;
use crate::pathfinder;

static MAZE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9-]*$").expect("maze id pattern is a valid regex")
});

/// Maze ids name archive entries and export files
pub fn validate_maze_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("maze id is required");
    }
    if id.len() > 64 {
        bail!("maze id '{}' is longer than 64 characters", id);
    }
    if !MAZE_ID.is_match(id) {
        bail!(
            "maze id '{}' doesn't match required pattern {}",
            id,
            MAZE_ID.as_str()
        );
    }
    Ok(())
}

/// Check for common maze issues (lint-like checks)
pub fn lint_grid(grid: &Grid) -> Vec<String> {
    let mut warnings = Vec::new();

    if grid.start() == grid.goal() {
        warnings.push("Start and goal are the same cell".to_string());
    }

    // The grid is its own perfect knowledge
    let dist = match pathfinder::distance_field(grid, grid, grid.start(), TraversalPolicy::Conservative)
    {
        Ok(dist) => dist,
        Err(e) => {
            warnings.push(format!("Could not analyse grid: {}", e));
            return warnings;
        }
    };
    let reach = |c: crate::models::Coord| dist[c.row * grid.cols() + c.col];

    match reach(grid.goal()) {
        None => warnings.push(format!("Goal {} is unreachable from the start", grid.goal())),
        Some(1) if grid.keys().is_empty() => {
            warnings.push("Goal is adjacent to the start".to_string())
        }
        _ => {}
    }

    for key in grid.keys() {
        if reach(*key).is_none() {
            warnings.push(format!("Key {} is unreachable from the start", key));
        }
    }

    let reachable = grid.coords().filter(|c| reach(*c).is_some()).count();
    let open = grid.open_cells();
    if reachable < open {
        warnings.push(format!(
            "{} open cell(s) can never be visited",
            open - reachable
        ));
    }

    warnings
}

/// Summary of how much of a grid some knowledge covers
pub fn coverage(grid: &Grid, knowledge: &Knowledge) -> f64 {
    let total = grid.rows() * grid.cols();
    if total == 0 {
        return 0.0;
    }
    let known = grid.coords().filter(|c| knowledge.query(*c).is_known()).count();
    known as f64 / total as f64
}
