//! Random maze generation
//!
//! Starts from a grid of walls and carves a randomized depth-first corridor
//! network through the interior. Then places the goal, the keys and the start
//! inside the carved region, which is connected, so every placed item is
//! reachable from the start. Last come a handful of extra openings (one per
//! hundred cells) that introduce loops.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::Grid;
use crate::error::{EngineError, EngineResult};
use crate::models::{Coord, Direction, Tile};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorOptions {
    pub rows: usize,
    pub cols: usize,
    pub keys: usize,
    /// Fixed seed for reproducible mazes
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            rows: 40,
            cols: 40,
            keys: 7,
            seed: None,
        }
    }
}

pub fn generate(options: &GeneratorOptions) -> EngineResult<Grid> {
    if options.rows < 3 || options.cols < 3 {
        return Err(EngineError::InvalidGrid(format!(
            "generated mazes need at least 3x3 cells, got {}x{}",
            options.rows, options.cols
        )));
    }

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut carver = Carver {
        rows: options.rows,
        cols: options.cols,
        tiles: vec![Tile::Wall; options.rows * options.cols],
    };

    let first = Coord::new(
        rng.gen_range(1..options.rows - 1),
        rng.gen_range(1..options.cols - 1),
    );
    carver.carve(first, &mut rng);

    let mut taken = Vec::with_capacity(options.keys + 2);
    let goal = carver.pick(Tile::Open, &taken, &mut rng)?;
    taken.push(goal);

    let mut keys = Vec::with_capacity(options.keys);
    for _ in 0..options.keys {
        let key = carver.pick(Tile::Open, &taken, &mut rng)?;
        taken.push(key);
        keys.push(key);
    }

    // Extra openings may be isolated, so the start comes from the carved cells
    let start = carver.pick(Tile::Open, &taken, &mut rng)?;

    for _ in 0..(options.rows * options.cols) / 100 {
        if let Ok(extra) = carver.pick(Tile::Wall, &taken, &mut rng) {
            carver.set(extra, Tile::Open);
        }
    }

    tracing::debug!(
        rows = options.rows,
        cols = options.cols,
        keys = options.keys,
        %start,
        %goal,
        "generated maze"
    );

    Grid::from_tiles(options.rows, options.cols, carver.tiles, start, goal, keys)
}

struct Carver {
    rows: usize,
    cols: usize,
    tiles: Vec<Tile>,
}

impl Carver {
    fn carve(&mut self, first: Coord, rng: &mut StdRng) {
        let mut pending = vec![first];
        while let Some(pos) = pending.pop() {
            if self.can_continue(pos) {
                self.set(pos, Tile::Open);
                pending.extend(self.adjacent_walls(pos));
                pending.shuffle(rng);
            }
        }
    }

    /// Interior walls with more than two wall neighbours keep corridors one cell wide
    fn can_continue(&self, pos: Coord) -> bool {
        self.is_interior(pos) && self.get(pos) == Tile::Wall && self.adjacent_walls(pos).len() > 2
    }

    fn adjacent_walls(&self, pos: Coord) -> Vec<Coord> {
        Direction::all()
            .iter()
            .filter_map(|dir| pos.step(*dir))
            .filter(|c| c.row < self.rows && c.col < self.cols)
            .filter(|c| self.get(*c) == Tile::Wall)
            .collect()
    }

    fn is_interior(&self, pos: Coord) -> bool {
        pos.row > 0 && pos.row < self.rows - 1 && pos.col > 0 && pos.col < self.cols - 1
    }

    fn get(&self, pos: Coord) -> Tile {
        self.tiles[pos.row * self.cols + pos.col]
    }

    fn set(&mut self, pos: Coord, tile: Tile) {
        self.tiles[pos.row * self.cols + pos.col] = tile;
    }

    /// Random interior cell holding `tile`, skipping `taken`
    fn pick(&self, tile: Tile, taken: &[Coord], rng: &mut StdRng) -> EngineResult<Coord> {
        let candidates: Vec<Coord> = (1..self.rows - 1)
            .flat_map(|row| (1..self.cols - 1).map(move |col| Coord::new(row, col)))
            .filter(|c| self.get(*c) == tile && !taken.contains(c))
            .collect();
        candidates.choose(rng).copied().ok_or_else(|| {
            EngineError::InvalidGrid(format!(
                "not enough {:?} cells to place every item in a {}x{} maze",
                tile, self.rows, self.cols
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TraversalPolicy;
    use crate::pathfinder;

    fn options(seed: u64) -> GeneratorOptions {
        GeneratorOptions {
            rows: 15,
            cols: 21,
            keys: 3,
            seed: Some(seed),
        }
    }

    #[test]
    fn test_same_seed_same_maze() {
        let a = generate(&options(7)).unwrap();
        let b = generate(&options(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_border_stays_walled() {
        let grid = generate(&options(11)).unwrap();
        for col in 0..grid.cols() {
            assert!(grid.cell_at(Coord::new(0, col)).unwrap().is_wall());
            assert!(grid.cell_at(Coord::new(grid.rows() - 1, col)).unwrap().is_wall());
        }
    }

    #[test]
    fn test_everything_reachable_in_ground_truth() {
        for seed in 0..5 {
            let grid = generate(&options(seed)).unwrap();
            assert_eq!(grid.keys().len(), 3);
            let start = grid.start();
            for target in grid.keys().iter().chain(std::iter::once(&grid.goal())) {
                pathfinder::find_path(&grid, &grid, start, *target, TraversalPolicy::Conservative)
                    .unwrap_or_else(|e| panic!("seed {}: {}", seed, e));
            }
        }
    }

    #[test]
    fn test_too_small() {
        let opts = GeneratorOptions {
            rows: 2,
            cols: 10,
            keys: 0,
            seed: Some(1),
        };
        assert!(generate(&opts).is_err());
    }

    #[test]
    fn test_too_many_keys() {
        let opts = GeneratorOptions {
            rows: 3,
            cols: 3,
            keys: 4,
            seed: Some(1),
        };
        assert!(generate(&opts).is_err());
    }
}
