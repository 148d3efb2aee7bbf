//! Immutable maze grid
//!
//! A grid is built once per maze and never changes afterwards. It holds the
//! ground truth (which cells are walls) together with the start, the goal
//! (the door) and any keys that must be collected before the goal counts.
//!
//! Text format, one line per row:
//! - `#` wall
//! - `.` open
//! - `S` start, `G` goal, `K` key (all open)

pub mod generate;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::knowledge::KnowledgeView;
use crate::models::{Cell, CellState, Coord, Direction, Tile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridDocument", into = "GridDocument")]
pub struct Grid {
    rows: usize,
    cols: usize,
    tiles: Vec<Tile>,
    start: Coord,
    goal: Coord,
    keys: Vec<Coord>,
}

impl Grid {
    /// Build a grid from a row-major tile vector
    pub fn from_tiles(
        rows: usize,
        cols: usize,
        tiles: Vec<Tile>,
        start: Coord,
        goal: Coord,
        keys: Vec<Coord>,
    ) -> EngineResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(EngineError::InvalidGrid(format!(
                "dimensions must be positive, got {}x{}",
                rows, cols
            )));
        }
        if tiles.len() != rows * cols {
            return Err(EngineError::InvalidGrid(format!(
                "expected {} tiles for a {}x{} grid, got {}",
                rows * cols,
                rows,
                cols,
                tiles.len()
            )));
        }

        let grid = Self {
            rows,
            cols,
            tiles,
            start,
            goal,
            keys,
        };

        for (name, coord) in [("start", start), ("goal", goal)] {
            if grid.cell_at(coord)?.is_wall() {
                return Err(EngineError::InvalidGrid(format!(
                    "{} {} is a wall",
                    name, coord
                )));
            }
        }
        for (idx, key) in grid.keys.iter().enumerate() {
            if grid.cell_at(*key)?.is_wall() {
                return Err(EngineError::InvalidGrid(format!("key {} is a wall", key)));
            }
            if *key == start {
                return Err(EngineError::InvalidGrid(format!(
                    "key {} is on the start cell",
                    key
                )));
            }
            if grid.keys[..idx].contains(key) {
                return Err(EngineError::InvalidGrid(format!("duplicate key {}", key)));
            }
        }

        Ok(grid)
    }

    /// Build a grid with every cell open except `walls`
    pub fn new(
        rows: usize,
        cols: usize,
        walls: &[Coord],
        start: Coord,
        goal: Coord,
    ) -> EngineResult<Self> {
        let mut tiles = vec![Tile::Open; rows * cols];
        for wall in walls {
            if wall.row >= rows || wall.col >= cols {
                return Err(EngineError::OutOfBounds {
                    coord: *wall,
                    rows,
                    cols,
                });
            }
            tiles[wall.row * cols + wall.col] = Tile::Wall;
        }
        Self::from_tiles(rows, cols, tiles, start, goal, Vec::new())
    }

    /// Same grid with keys to collect
    pub fn with_keys(self, keys: Vec<Coord>) -> EngineResult<Self> {
        Self::from_tiles(self.rows, self.cols, self.tiles, self.start, self.goal, keys)
    }

    /// Parse the text format
    pub fn parse(text: &str) -> EngineResult<Self> {
        let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        let rows = lines.len();
        let cols = lines.first().map(|l| l.chars().count()).unwrap_or(0);
        let mut tiles = Vec::with_capacity(rows * cols);
        let mut start = None;
        let mut goal = None;
        let mut keys = Vec::new();

        for (row, line) in lines.iter().enumerate() {
            if line.chars().count() != cols {
                return Err(EngineError::InvalidGrid(format!(
                    "line {} has width {}, expected {}",
                    row + 1,
                    line.chars().count(),
                    cols
                )));
            }
            for (col, ch) in line.chars().enumerate() {
                let coord = Coord::new(row, col);
                let tile = match ch {
                    '#' => Tile::Wall,
                    '.' => Tile::Open,
                    'S' => {
                        if start.replace(coord).is_some() {
                            return Err(EngineError::InvalidGrid(format!(
                                "second start on line {}",
                                row + 1
                            )));
                        }
                        Tile::Open
                    }
                    'G' => {
                        if goal.replace(coord).is_some() {
                            return Err(EngineError::InvalidGrid(format!(
                                "second goal on line {}",
                                row + 1
                            )));
                        }
                        Tile::Open
                    }
                    'K' => {
                        keys.push(coord);
                        Tile::Open
                    }
                    other => {
                        return Err(EngineError::InvalidGrid(format!(
                            "unexpected character '{}' on line {}",
                            other,
                            row + 1
                        )))
                    }
                };
                tiles.push(tile);
            }
        }

        let start = start.ok_or_else(|| EngineError::InvalidGrid("no start (S)".to_string()))?;
        let goal = goal.ok_or_else(|| EngineError::InvalidGrid("no goal (G)".to_string()))?;
        Self::from_tiles(rows, cols, tiles, start, goal, keys)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn start(&self) -> Coord {
        self.start
    }

    pub fn goal(&self) -> Coord {
        self.goal
    }

    pub fn keys(&self) -> &[Coord] {
        &self.keys
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.row < self.rows && coord.col < self.cols
    }

    /// Fails with `OutOfBounds` unless `coord` is inside the grid
    pub fn check(&self, coord: Coord) -> EngineResult<()> {
        if self.contains(coord) {
            Ok(())
        } else {
            Err(EngineError::OutOfBounds {
                coord,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    pub fn cell_at(&self, coord: Coord) -> EngineResult<Cell> {
        self.check(coord)?;
        Ok(Cell {
            coord,
            tile: self.tiles[coord.row * self.cols + coord.col],
        })
    }

    /// In-range orthogonal neighbours, ascending
    pub fn neighbors(&self, coord: Coord) -> EngineResult<Vec<Coord>> {
        self.check(coord)?;
        let mut result: Vec<Coord> = Direction::all()
            .iter()
            .filter_map(|dir| coord.step(*dir))
            .filter(|c| self.contains(*c))
            .collect();
        result.sort();
        Ok(result)
    }

    /// Every coordinate, row-major
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Coord::new(row, col)))
    }

    pub fn open_cells(&self) -> usize {
        self.tiles.iter().filter(|t| **t == Tile::Open).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl KnowledgeView for Grid {
    fn query(&self, coord: Coord) -> CellState {
        self.cell_at(coord)
            .map(|cell| cell.tile.as_state())
            .unwrap_or(CellState::Unknown)
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..self.rows {
            let line: String = (0..self.cols)
                .map(|col| {
                    let coord = Coord::new(row, col);
                    if coord == self.start {
                        'S'
                    } else if coord == self.goal {
                        'G'
                    } else if self.keys.contains(&coord) {
                        'K'
                    } else if self.tiles[row * self.cols + col] == Tile::Wall {
                        '#'
                    } else {
                        '.'
                    }
                })
                .collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Serialized shape of a grid
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GridDocument {
    rows: usize,
    cols: usize,
    start: Coord,
    goal: Coord,
    #[serde(default)]
    keys: Vec<Coord>,
    cells: Vec<Vec<Tile>>,
}

impl From<Grid> for GridDocument {
    fn from(grid: Grid) -> Self {
        let cells = grid.tiles.chunks(grid.cols).map(|row| row.to_vec()).collect();
        Self {
            rows: grid.rows,
            cols: grid.cols,
            start: grid.start,
            goal: grid.goal,
            keys: grid.keys,
            cells,
        }
    }
}

impl TryFrom<GridDocument> for Grid {
    type Error = EngineError;

    fn try_from(doc: GridDocument) -> Result<Self, Self::Error> {
        if doc.cells.len() != doc.rows || doc.cells.iter().any(|r| r.len() != doc.cols) {
            return Err(EngineError::InvalidGrid(
                "cells do not match declared dimensions".to_string(),
            ));
        }
        let tiles = doc.cells.into_iter().flatten().collect();
        Grid::from_tiles(doc.rows, doc.cols, tiles, doc.start, doc.goal, doc.keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "\
S.#
.##
..G
";

    #[test]
    fn test_parse_small_maze() {
        let grid = Grid::parse(SMALL).unwrap();
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.start(), Coord::new(0, 0));
        assert_eq!(grid.goal(), Coord::new(2, 2));
        assert!(grid.cell_at(Coord::new(0, 2)).unwrap().is_wall());
        assert!(!grid.cell_at(Coord::new(2, 1)).unwrap().is_wall());
        assert_eq!(grid.to_string(), SMALL);
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let err = Grid::parse("S..\n.G\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_requires_start_and_goal() {
        assert!(Grid::parse("...\n..G\n").is_err());
        assert!(Grid::parse("S..\n...\n").is_err());
        assert!(Grid::parse("S.G\nS..\n").is_err());
    }

    #[test]
    fn test_cell_at_out_of_bounds() {
        let grid = Grid::parse(SMALL).unwrap();
        let err = grid.cell_at(Coord::new(3, 0)).unwrap_err();
        assert_eq!(
            err,
            EngineError::OutOfBounds {
                coord: Coord::new(3, 0),
                rows: 3,
                cols: 3
            }
        );
    }

    #[test]
    fn test_neighbors_stay_in_range() {
        let grid = Grid::new(4, 5, &[], Coord::new(0, 0), Coord::new(3, 4)).unwrap();
        for coord in grid.coords().collect::<Vec<_>>() {
            grid.cell_at(coord).unwrap();
            let neighbors = grid.neighbors(coord).unwrap();
            assert!(neighbors.len() >= 2 && neighbors.len() <= 4);
            for n in neighbors {
                assert!(grid.contains(n), "{} escaped the grid", n);
            }
        }
        assert_eq!(
            grid.neighbors(Coord::new(0, 0)).unwrap(),
            vec![Coord::new(0, 1), Coord::new(1, 0)]
        );
    }

    #[test]
    fn test_start_on_wall_is_rejected() {
        let result = Grid::new(2, 2, &[Coord::new(0, 0)], Coord::new(0, 0), Coord::new(1, 1));
        assert!(matches!(result, Err(EngineError::InvalidGrid(_))));
    }

    #[test]
    fn test_keys_validated() {
        let grid = Grid::new(2, 3, &[Coord::new(0, 1)], Coord::new(0, 0), Coord::new(1, 2)).unwrap();
        assert!(grid.clone().with_keys(vec![Coord::new(0, 1)]).is_err());
        assert!(grid.clone().with_keys(vec![Coord::new(0, 0)]).is_err());
        assert!(grid
            .clone()
            .with_keys(vec![Coord::new(1, 0), Coord::new(1, 0)])
            .is_err());
        let keyed = grid.with_keys(vec![Coord::new(1, 0)]).unwrap();
        assert_eq!(keyed.keys(), &[Coord::new(1, 0)]);
    }

    #[test]
    fn test_json_shape() {
        let grid = Grid::parse(SMALL).unwrap();
        let value: serde_json::Value = serde_json::from_str(&grid.to_json().unwrap()).unwrap();
        assert_eq!(value["rows"], 3);
        assert_eq!(value["cells"][0][2], "wall");
        assert_eq!(value["goal"]["row"], 2);
        let back: Grid = serde_json::from_value(value).unwrap();
        assert_eq!(back, grid);
    }
}
