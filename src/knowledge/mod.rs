//! Knowledge accumulated while exploring a maze
//!
//! Knowledge only ever gets more specific: a cell goes from unknown to open
//! or wall and stays there. Recording the opposite state is a contradiction.
//!
//! [`KnowledgeStore`] is the single writer owned by a session. [`Knowledge`]
//! is an immutable snapshot that shares storage with the store until the
//! store's next write, so snapshots are cheap and can be handed to any number
//! of readers on other threads.
//!
//! Keys are part of the knowledge too: the explorer only knows where a key is
//! once it has seen it.

pub mod export;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::grid::Grid;
use crate::models::{CellState, Coord};

/// Read access to cell states, implemented by the store, its snapshots and
/// the grid itself (as perfect knowledge)
pub trait KnowledgeView {
    fn query(&self, coord: Coord) -> CellState;
}

/// Immutable point-in-time knowledge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Knowledge {
    cells: Arc<BTreeMap<Coord, CellState>>,
    visited: Arc<BTreeSet<Coord>>,
    keys: Arc<BTreeSet<Coord>>,
}

impl Knowledge {
    pub fn query(&self, coord: Coord) -> CellState {
        self.cells.get(&coord).copied().unwrap_or(CellState::Unknown)
    }

    pub fn is_visited(&self, coord: Coord) -> bool {
        self.visited.contains(&coord)
    }

    /// Number of cells with a known state
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Known cells in coordinate order
    pub fn known(&self) -> impl Iterator<Item = (Coord, CellState)> + '_ {
        self.cells.iter().map(|(c, s)| (*c, *s))
    }

    pub fn visited(&self) -> impl Iterator<Item = Coord> + '_ {
        self.visited.iter().copied()
    }

    /// Keys seen so far, collected or not
    pub fn keys(&self) -> impl Iterator<Item = Coord> + '_ {
        self.keys.iter().copied()
    }

    pub fn has_key(&self, coord: Coord) -> bool {
        self.keys.contains(&coord)
    }

    pub fn count(&self, state: CellState) -> usize {
        self.cells.values().filter(|s| **s == state).count()
    }

    /// Confirmed-open cells with exactly one open way out and every
    /// neighbour known. Start, goal and keys are never dead ends.
    pub fn dead_ends(&self, grid: &Grid) -> Vec<Coord> {
        self.cells
            .iter()
            .filter(|(_, state)| **state == CellState::Open)
            .map(|(coord, _)| *coord)
            .filter(|coord| {
                *coord != grid.start() && *coord != grid.goal() && !grid.keys().contains(coord)
            })
            .filter(|coord| {
                let Ok(neighbors) = grid.neighbors(*coord) else {
                    return false;
                };
                let states: Vec<CellState> = neighbors.iter().map(|n| self.query(*n)).collect();
                states.iter().all(|s| s.is_known())
                    && states.iter().filter(|s| **s == CellState::Open).count() == 1
            })
            .collect()
    }

    /// Every coordinate in the knowledge must lie inside `grid`
    pub fn check_bounds(&self, grid: &Grid) -> EngineResult<()> {
        self.cells
            .keys()
            .chain(self.keys.iter())
            .try_for_each(|coord| grid.check(*coord))
    }

    /// Confirmed-open cells not yet stood on that border at least one
    /// unknown cell, in coordinate order
    pub fn frontier(&self, grid: &Grid) -> Vec<Coord> {
        self.cells
            .iter()
            .filter(|(coord, state)| **state == CellState::Open && !self.visited.contains(*coord))
            .map(|(coord, _)| *coord)
            .filter(|coord| {
                grid.neighbors(*coord)
                    .map(|ns| ns.iter().any(|n| !self.query(*n).is_known()))
                    .unwrap_or(false)
            })
            .collect()
    }
}

impl KnowledgeView for Knowledge {
    fn query(&self, coord: Coord) -> CellState {
        Knowledge::query(self, coord)
    }
}

/// Writable knowledge owned by one session
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    current: Knowledge,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from previously exported or snapshotted knowledge
    pub fn from_knowledge(knowledge: Knowledge) -> Self {
        Self { current: knowledge }
    }

    /// Record `state` for `coord`. Returns whether anything changed.
    pub fn observe(&mut self, coord: Coord, state: CellState) -> EngineResult<bool> {
        if !state.is_known() {
            return Ok(false);
        }
        match self.current.query(coord) {
            CellState::Unknown => {
                Arc::make_mut(&mut self.current.cells).insert(coord, state);
                tracing::trace!(%coord, %state, "observed");
                Ok(true)
            }
            known if known == state => Ok(false),
            known => Err(EngineError::Contradiction {
                coord,
                known,
                observed: state,
            }),
        }
    }

    /// Mark a cell as stood on. A visited cell is an open cell.
    pub fn mark_visited(&mut self, coord: Coord) -> EngineResult<bool> {
        let opened = self.observe(coord, CellState::Open)?;
        let visited = Arc::make_mut(&mut self.current.visited).insert(coord);
        Ok(opened || visited)
    }

    /// Record a key at `coord`. A key lies on an open cell.
    pub fn note_key(&mut self, coord: Coord) -> EngineResult<bool> {
        let opened = self.observe(coord, CellState::Open)?;
        let noted = Arc::make_mut(&mut self.current.keys).insert(coord);
        Ok(opened || noted)
    }

    /// Drop everything known about `coord` so it can be observed afresh
    pub fn forget(&mut self, coord: Coord) -> bool {
        let had_state = self.current.cells.contains_key(&coord)
            && Arc::make_mut(&mut self.current.cells).remove(&coord).is_some();
        let had_visit = self.current.visited.contains(&coord)
            && Arc::make_mut(&mut self.current.visited).remove(&coord);
        let had_key = self.current.keys.contains(&coord)
            && Arc::make_mut(&mut self.current.keys).remove(&coord);
        let forgot = had_state || had_visit || had_key;
        if forgot {
            tracing::debug!(%coord, "forgot cell");
        }
        forgot
    }

    pub fn query(&self, coord: Coord) -> CellState {
        self.current.query(coord)
    }

    pub fn is_visited(&self, coord: Coord) -> bool {
        self.current.is_visited(coord)
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn has_key(&self, coord: Coord) -> bool {
        self.current.has_key(coord)
    }

    pub fn snapshot(&self) -> Knowledge {
        self.current.clone()
    }
}

impl KnowledgeView for KnowledgeStore {
    fn query(&self, coord: Coord) -> CellState {
        KnowledgeStore::query(self, coord)
    }
}
