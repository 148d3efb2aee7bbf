//! Data models for the maze engine
//!
//! Coordinates, tiles, knowledge states and paths. Everything here is plain
//! data; behaviour lives in the grid, pathfinder, knowledge and session modules.

use serde::{Deserialize, Serialize};

/// A grid coordinate. Ordering is lexicographic: row first, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// The adjacent coordinate in `dir`, or `None` when it would underflow.
    /// Upper bounds are the grid's business.
    pub fn step(&self, dir: Direction) -> Option<Coord> {
        match dir {
            Direction::Up if self.row > 0 => Some(Coord::new(self.row - 1, self.col)),
            Direction::Down => Some(Coord::new(self.row + 1, self.col)),
            Direction::Left if self.col > 0 => Some(Coord::new(self.row, self.col - 1)),
            Direction::Right => Some(Coord::new(self.row, self.col + 1)),
            _ => None,
        }
    }

    /// Direction from `self` to an adjacent `other`
    pub fn direction_to(&self, other: &Coord) -> Option<Direction> {
        Direction::all()
            .iter()
            .copied()
            .find(|dir| self.step(*dir).as_ref() == Some(other))
    }

    /// Text form used as a key in exported knowledge: `row,col`
    pub fn to_key(&self) -> String {
        format!("{},{}", self.row, self.col)
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl std::str::FromStr for Coord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, col) = s
            .split_once(',')
            .ok_or_else(|| format!("Invalid coordinate: {}. Use: row,col", s))?;
        let row = row
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("Invalid row in coordinate: {}", s))?;
        let col = col
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("Invalid column in coordinate: {}", s))?;
        Ok(Coord::new(row, col))
    }
}

/// One of the four moves available to the explorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn all() -> &'static [Direction] {
        static ALL: [Direction; 4] = [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ];
        &ALL
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
        }
    }
}

/// Ground truth for a single grid location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tile {
    Wall,
    Open,
}

impl Tile {
    pub fn as_state(&self) -> CellState {
        match self {
            Tile::Wall => CellState::Wall,
            Tile::Open => CellState::Open,
        }
    }
}

/// A cell as read from the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub coord: Coord,
    pub tile: Tile,
}

impl Cell {
    pub fn is_wall(&self) -> bool {
        self.tile == Tile::Wall
    }
}

/// What is known about a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Unknown,
    Open,
    Wall,
}

impl CellState {
    pub fn is_known(&self) -> bool {
        !matches!(self, CellState::Unknown)
    }
}

impl std::fmt::Display for CellState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellState::Unknown => write!(f, "unknown"),
            CellState::Open => write!(f, "open"),
            CellState::Wall => write!(f, "wall"),
        }
    }
}

impl std::str::FromStr for CellState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(CellState::Unknown),
            "open" => Ok(CellState::Open),
            "wall" => Ok(CellState::Wall),
            _ => Err(format!("Invalid cell state: {}. Use: unknown, open, wall", s)),
        }
    }
}

/// How the pathfinder treats cells whose state is not yet known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TraversalPolicy {
    /// Explore through unknown cells
    #[default]
    Optimistic,
    /// Only traverse confirmed-open cells
    Conservative,
}

impl TraversalPolicy {
    pub fn allows(&self, state: CellState) -> bool {
        match self {
            TraversalPolicy::Optimistic => state != CellState::Wall,
            TraversalPolicy::Conservative => state == CellState::Open,
        }
    }
}

impl std::fmt::Display for TraversalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraversalPolicy::Optimistic => write!(f, "optimistic"),
            TraversalPolicy::Conservative => write!(f, "conservative"),
        }
    }
}

impl std::str::FromStr for TraversalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "optimistic" => Ok(TraversalPolicy::Optimistic),
            "conservative" => Ok(TraversalPolicy::Conservative),
            _ => Err(format!(
                "Invalid policy: {}. Use: optimistic, conservative",
                s
            )),
        }
    }
}

/// An ordered route of 4-adjacent cells, first element is where it starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path(Vec<Coord>);

impl Path {
    pub fn new(cells: Vec<Coord>) -> Self {
        Self(cells)
    }

    pub fn cells(&self) -> &[Coord] {
        &self.0
    }

    /// Number of cells, start and end included
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of moves needed to walk the path
    pub fn moves(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn start(&self) -> Option<&Coord> {
        self.0.first()
    }

    pub fn end(&self) -> Option<&Coord> {
        self.0.last()
    }

    pub fn contains(&self, coord: &Coord) -> bool {
        self.0.contains(coord)
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(" -> "))
    }
}
