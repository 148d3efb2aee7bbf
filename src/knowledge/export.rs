//! Versioned JSON encoding of knowledge
//!
//! ```json
//! {
//!   "$schema": "mazekeeper://knowledge/v1",
//!   "exported_at": 1760486400,
//!   "cells": { "0,0": "open", "0,1": "wall" },
//!   "visited": ["0,0"],
//!   "keys": ["0,1"]
//! }
//! ```
//!
//! Keys are written in sorted order so the same knowledge always encodes to
//! the same text, apart from the timestamp.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Knowledge;
use crate::error::{EngineError, EngineResult};
use crate::models::{CellState, Coord};

pub const SCHEMA_V1: &str = "mazekeeper://knowledge/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    #[serde(rename = "$schema")]
    pub schema: String,
    #[serde(default)]
    pub exported_at: i64,
    #[serde(default)]
    pub cells: BTreeMap<String, CellState>,
    #[serde(default)]
    pub visited: Vec<String>,
    /// Keys seen, collected or not
    #[serde(default)]
    pub keys: Vec<String>,
}

impl KnowledgeDocument {
    pub fn from_knowledge(knowledge: &Knowledge) -> Self {
        Self {
            schema: SCHEMA_V1.to_string(),
            exported_at: chrono::Utc::now().timestamp(),
            cells: knowledge.known().map(|(c, s)| (c.to_key(), s)).collect(),
            visited: knowledge.visited().map(|c| c.to_key()).collect(),
            keys: knowledge.keys().map(|c| c.to_key()).collect(),
        }
    }

    pub fn into_knowledge(self) -> EngineResult<Knowledge> {
        if self.schema != SCHEMA_V1 {
            return Err(EngineError::UnsupportedVersion(self.schema));
        }

        let mut cells = BTreeMap::new();
        for (key, state) in self.cells {
            let coord = parse_key(&key)?;
            if !state.is_known() {
                return Err(EngineError::InvalidKnowledge(format!(
                    "cell {} is recorded as unknown",
                    key
                )));
            }
            cells.insert(coord, state);
        }

        let visited = open_cells(&mut cells, self.visited)?;
        let keys = open_cells(&mut cells, self.keys)?;

        Ok(Knowledge {
            cells: Arc::new(cells),
            visited: Arc::new(visited),
            keys: Arc::new(keys),
        })
    }
}

/// Visited cells and keys are open; record them so, rejecting known walls
fn open_cells(
    cells: &mut BTreeMap<Coord, CellState>,
    entries: Vec<String>,
) -> EngineResult<BTreeSet<Coord>> {
    let mut coords = BTreeSet::new();
    for key in entries {
        let coord = parse_key(&key)?;
        match cells.get(&coord) {
            Some(CellState::Wall) => {
                return Err(EngineError::Contradiction {
                    coord,
                    known: CellState::Wall,
                    observed: CellState::Open,
                })
            }
            Some(_) => {}
            None => {
                cells.insert(coord, CellState::Open);
            }
        }
        coords.insert(coord);
    }
    Ok(coords)
}

fn parse_key(key: &str) -> EngineResult<Coord> {
    key.parse::<Coord>().map_err(EngineError::InvalidKnowledge)
}

/// Encode knowledge as a versioned JSON document
pub fn export(knowledge: &Knowledge) -> EngineResult<String> {
    serde_json::to_string_pretty(&KnowledgeDocument::from_knowledge(knowledge))
        .map_err(|e| EngineError::InvalidKnowledge(format!("Failed to serialize: {}", e)))
}

/// Decode a document produced by [`export`]
pub fn import(text: &str) -> EngineResult<Knowledge> {
    let doc: KnowledgeDocument = serde_json::from_str(text)
        .map_err(|e| EngineError::InvalidKnowledge(format!("Failed to parse: {}", e)))?;
    doc.into_knowledge()
}
