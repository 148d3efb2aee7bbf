//! Exploration session state machine
//!
//! One session is one run from the start cell to the goal:
//! - idle -> planning: look around the start cell
//! - planning -> moving: a path to the next target exists
//! - planning -> finished: no path exists (failure)
//!
//! Targets, in order: the nearest seen key not yet collected, the nearest
//! unexplored cell while keys are still missing and none is in sight, then
//! the goal. Keys are only known once seen from a neighbouring cell.
//! - moving -> observing: one step along the plan
//! - observing -> finished: at the goal with every key collected (success)
//! - observing -> planning: the plan hit a newly seen wall, a key came into
//!   sight, or the plan reached its target
//! - observing -> moving: otherwise
//!
//! Every transition is appended to the session's event history.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::grid::Grid;
use crate::knowledge::{export, Knowledge, KnowledgeStore};
use crate::models::{CellState, Coord, Direction, Path, TraversalPolicy};
use crate::pathfinder;

/// How a finished session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { moves: usize },
    Failure(EngineError),
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success { moves } => write!(f, "success after {} moves", moves),
            Outcome::Failure(err) => write!(f, "failure: {}", err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Planning,
    Moving,
    Observing,
    Finished(Outcome),
}

impl SessionState {
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionState::Finished(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Planning => "planning",
            SessionState::Moving => "moving",
            SessionState::Observing => "observing",
            SessionState::Finished(_) => "finished",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Finished(outcome) => write!(f, "finished ({})", outcome),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// What the explorer saw from one position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub position: Coord,
    /// Cells whose state was learned by this observation
    pub revealed: Vec<(Coord, CellState)>,
    /// Keys that came into sight with this observation
    pub keys_seen: Vec<Coord>,
    pub key_collected: Option<Coord>,
}

/// Result of a single `step`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub state: SessionState,
    /// Most recent observation, made by this step or an earlier one
    pub last_observation: Option<Observation>,
}

/// Session history entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started(Coord),
    Observed { position: Coord, revealed: usize },
    KeySeen(Coord),
    KeyCollected(Coord),
    Planned { target: Coord, moves: usize },
    Moved { from: Coord, to: Coord, direction: Direction },
    Blocked(Coord),
    Replanning(String),
    Finished(Outcome),
}

impl SessionEvent {
    pub fn as_string(&self) -> String {
        match self {
            SessionEvent::Started(at) => format!("started:{}", at.to_key()),
            SessionEvent::Observed { position, revealed } => {
                format!("observed:{}:{}", position.to_key(), revealed)
            }
            SessionEvent::KeySeen(at) => format!("key-seen:{}", at.to_key()),
            SessionEvent::KeyCollected(at) => format!("key:{}", at.to_key()),
            SessionEvent::Planned { target, moves } => {
                format!("planned:{}:{}", target.to_key(), moves)
            }
            SessionEvent::Moved { from, to, direction } => {
                format!("moved:{}:{}:{}", from.to_key(), to.to_key(), direction)
            }
            SessionEvent::Blocked(at) => format!("blocked:{}", at.to_key()),
            SessionEvent::Replanning(reason) => format!("replanning:{}", reason),
            SessionEvent::Finished(Outcome::Success { moves }) => format!("success:{}", moves),
            SessionEvent::Finished(Outcome::Failure(err)) => format!("failure:{}", err),
        }
    }
}

/// A single exploration run over one grid
pub struct Session {
    id: uuid::Uuid,
    grid: Arc<Grid>,
    store: KnowledgeStore,
    policy: TraversalPolicy,
    state: SessionState,
    position: Coord,
    plan: Option<Path>,
    cursor: usize,
    moves: usize,
    collected: BTreeSet<Coord>,
    trail: Vec<Coord>,
    events: Vec<SessionEvent>,
    last_observation: Option<Observation>,
}

impl Session {
    /// Start a session, optionally continuing from earlier knowledge
    pub fn create(
        grid: impl Into<Arc<Grid>>,
        start_knowledge: Option<Knowledge>,
        policy: TraversalPolicy,
    ) -> EngineResult<Self> {
        let grid = grid.into();
        let store = match start_knowledge {
            Some(knowledge) => {
                knowledge.check_bounds(&grid)?;
                KnowledgeStore::from_knowledge(knowledge)
            }
            None => KnowledgeStore::new(),
        };
        let start = grid.start();
        let id = uuid::Uuid::new_v4();

        tracing::info!(
            session = %id,
            %policy,
            %start,
            goal = %grid.goal(),
            keys = grid.keys().len(),
            known = store.len(),
            "session created"
        );

        Ok(Self {
            id,
            grid,
            store,
            policy,
            state: SessionState::Idle,
            position: start,
            plan: None,
            cursor: 0,
            moves: 0,
            collected: BTreeSet::new(),
            trail: vec![start],
            events: Vec::new(),
            last_observation: None,
        })
    }

    /// Advance the state machine by one transition.
    ///
    /// A contradiction found while observing is returned as an error and the
    /// session and its knowledge are left untouched; after
    /// [`Session::reset_knowledge`] the next `step` observes again.
    pub fn step(&mut self) -> EngineResult<StepReport> {
        match self.state {
            SessionState::Idle => {
                if self.events.is_empty() {
                    self.events.push(SessionEvent::Started(self.position));
                }
                let observation = self.observe()?;
                self.last_observation = Some(observation);
                self.transition(SessionState::Planning);
            }
            SessionState::Planning => self.plan()?,
            SessionState::Moving => self.advance()?,
            SessionState::Observing => {
                let observation = self.observe()?;
                let sighted = !observation.keys_seen.is_empty();
                self.last_observation = Some(observation);
                self.after_observation(sighted);
            }
            SessionState::Finished(_) => {}
        }

        Ok(StepReport {
            state: self.state.clone(),
            last_observation: self.last_observation.clone(),
        })
    }

    /// Step until finished or `max_steps` transitions have run
    pub fn run(&mut self, max_steps: usize) -> EngineResult<&SessionState> {
        for _ in 0..max_steps {
            if self.state.is_finished() {
                break;
            }
            self.step()?;
        }
        Ok(&self.state)
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn policy(&self) -> TraversalPolicy {
        self.policy
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn position(&self) -> Coord {
        self.position
    }

    pub fn moves(&self) -> usize {
        self.moves
    }

    /// Cells walked so far, start included
    pub fn trail(&self) -> &[Coord] {
        &self.trail
    }

    pub fn keys_collected(&self) -> impl Iterator<Item = &Coord> {
        self.collected.iter()
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn last_observation(&self) -> Option<&Observation> {
        self.last_observation.as_ref()
    }

    /// The plan currently being followed, if any
    pub fn current_path(&self) -> Option<&Path> {
        self.plan.as_ref()
    }

    /// The part of the current plan still ahead, current position first
    pub fn remaining_path(&self) -> Option<&[Coord]> {
        self.plan.as_ref().map(|p| &p.cells()[self.cursor.min(p.len())..])
    }

    pub fn knowledge(&self) -> Knowledge {
        self.store.snapshot()
    }

    pub fn export_knowledge(&self) -> EngineResult<String> {
        export::export(&self.store.snapshot())
    }

    /// Forget a cell, typically one named by a `Contradiction`
    pub fn reset_knowledge(&mut self, coord: Coord) -> EngineResult<bool> {
        self.grid.check(coord)?;
        tracing::warn!(session = %self.id, %coord, "resetting knowledge");
        Ok(self.store.forget(coord))
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(session = %self.id, from = self.state.name(), to = next.name(), "transition");
        self.state = next;
    }

    fn finish(&mut self, outcome: Outcome) {
        match &outcome {
            Outcome::Success { moves } => {
                tracing::info!(session = %self.id, moves, "session finished")
            }
            Outcome::Failure(err) => {
                tracing::warn!(session = %self.id, error = %err, "session failed")
            }
        }
        self.plan = None;
        self.events.push(SessionEvent::Finished(outcome.clone()));
        self.transition(SessionState::Finished(outcome));
    }

    fn remaining_keys(&self) -> Vec<Coord> {
        self.grid
            .keys()
            .iter()
            .filter(|k| !self.collected.contains(k))
            .copied()
            .collect()
    }

    /// Seen keys that still have to be picked up
    fn keys_in_sight(&self, snapshot: &Knowledge) -> Vec<Coord> {
        snapshot
            .keys()
            .filter(|k| self.grid.keys().contains(k) && !self.collected.contains(k))
            .collect()
    }

    fn plan(&mut self) -> EngineResult<()> {
        let snapshot = self.store.snapshot();
        let targets = if !self.remaining_keys().is_empty() {
            let in_sight = self.keys_in_sight(&snapshot);
            if in_sight.is_empty() {
                snapshot.frontier(&self.grid)
            } else {
                in_sight
            }
        } else if self.position == self.grid.goal() {
            self.finish(Outcome::Success { moves: self.moves });
            return Ok(());
        } else {
            vec![self.grid.goal()]
        };

        if targets.is_empty() {
            // explored everything reachable and keys are still missing
            self.finish(Outcome::Failure(EngineError::Unreachable {
                from: self.position,
                to: self.grid.goal(),
                policy: self.policy,
            }));
            return Ok(());
        }

        match pathfinder::nearest(&self.grid, &snapshot, self.position, &targets, self.policy) {
            Ok(path) => {
                let target = path.end().copied().unwrap_or(self.position);
                tracing::debug!(session = %self.id, %target, moves = path.moves(), "planned");
                self.events.push(SessionEvent::Planned {
                    target,
                    moves: path.moves(),
                });
                self.plan = Some(path);
                self.cursor = 0;
                self.transition(SessionState::Moving);
                Ok(())
            }
            Err(err @ EngineError::Unreachable { .. }) => {
                self.finish(Outcome::Failure(err));
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn advance(&mut self) -> EngineResult<()> {
        let next = self
            .plan
            .as_ref()
            .and_then(|p| p.cells().get(self.cursor + 1))
            .copied();
        let Some(next) = next else {
            self.events.push(SessionEvent::Replanning("plan exhausted".to_string()));
            self.transition(SessionState::Planning);
            return Ok(());
        };

        if self.grid.cell_at(next)?.is_wall() {
            tracing::debug!(session = %self.id, at = %next, "bumped into a wall");
            self.events.push(SessionEvent::Blocked(next));
        } else {
            let from = self.position;
            if let Some(direction) = from.direction_to(&next) {
                self.events.push(SessionEvent::Moved {
                    from,
                    to: next,
                    direction,
                });
            }
            self.position = next;
            self.cursor += 1;
            self.moves += 1;
            self.trail.push(next);
        }
        self.transition(SessionState::Observing);
        Ok(())
    }

    /// Record the current cell and everything visible from it.
    /// Nothing is written unless every sighting agrees with the store.
    fn observe(&mut self) -> EngineResult<Observation> {
        let position = self.position;
        let mut sightings = vec![(position, CellState::Open)];
        for neighbor in self.grid.neighbors(position)? {
            sightings.push((neighbor, self.grid.cell_at(neighbor)?.tile.as_state()));
        }

        for (coord, observed) in &sightings {
            let known = self.store.query(*coord);
            if known.is_known() && known != *observed {
                return Err(self.rejected(EngineError::Contradiction {
                    coord: *coord,
                    known,
                    observed: *observed,
                }));
            }
        }

        let mut revealed = Vec::new();
        let mut keys_seen = Vec::new();
        for (coord, state) in sightings {
            if self.store.observe(coord, state)? {
                revealed.push((coord, state));
            }
            if self.grid.keys().contains(&coord) && !self.store.has_key(coord) {
                self.store.note_key(coord)?;
                tracing::debug!(session = %self.id, key = %coord, "key in sight");
                self.events.push(SessionEvent::KeySeen(coord));
                keys_seen.push(coord);
            }
        }
        self.store.mark_visited(position)?;

        let key_collected = if self.grid.keys().contains(&position) && self.collected.insert(position)
        {
            tracing::info!(session = %self.id, key = %position, "key collected");
            self.events.push(SessionEvent::KeyCollected(position));
            Some(position)
        } else {
            None
        };

        self.events.push(SessionEvent::Observed {
            position,
            revealed: revealed.len(),
        });

        Ok(Observation {
            position,
            revealed,
            keys_seen,
            key_collected,
        })
    }

    fn after_observation(&mut self, key_sighted: bool) {
        if self.position == self.grid.goal() && self.remaining_keys().is_empty() {
            self.finish(Outcome::Success { moves: self.moves });
            return;
        }

        let reason = match &self.plan {
            _ if key_sighted => Some("key in sight".to_string()),
            None => Some("no plan".to_string()),
            Some(plan) if self.cursor + 1 >= plan.len() => Some("target reached".to_string()),
            Some(plan) => plan.cells()[self.cursor + 1..]
                .iter()
                .find(|c| !self.policy.allows(self.store.query(**c)))
                .map(|c| format!("{} is blocked", c.to_key())),
        };

        match reason {
            Some(reason) => {
                tracing::debug!(session = %self.id, %reason, "replanning");
                self.events.push(SessionEvent::Replanning(reason));
                self.plan = None;
                self.transition(SessionState::Planning);
            }
            None => self.transition(SessionState::Moving),
        }
    }

    fn rejected(&self, err: EngineError) -> EngineError {
        tracing::warn!(session = %self.id, error = %err, "observation rejected");
        err
    }
}
