//! Breadth-first pathfinding over what is known about a grid
//!
//! Cells known to be walls are never entered. Unknown cells are entered only
//! under the optimistic policy. The start cell is always passable because the
//! explorer is standing on it.
//!
//! Among several shortest paths the lexicographically smallest one wins: the
//! path is rebuilt from a distance field rooted at the goal by always stepping
//! to the smallest neighbour that is one move closer.

use std::collections::VecDeque;

use crate::error::{EngineError, EngineResult};
use crate::grid::Grid;
use crate::knowledge::KnowledgeView;
use crate::models::{Coord, Path, TraversalPolicy};

/// Shortest path from `start` to `goal` under `policy`
pub fn find_path<K>(
    grid: &Grid,
    knowledge: &K,
    start: Coord,
    goal: Coord,
    policy: TraversalPolicy,
) -> EngineResult<Path>
where
    K: KnowledgeView + ?Sized,
{
    grid.check(start)?;
    grid.check(goal)?;

    if start == goal {
        return Ok(Path::new(vec![start]));
    }

    let passable = |c: Coord| c == start || policy.allows(knowledge.query(c));
    let unreachable = || EngineError::Unreachable {
        from: start,
        to: goal,
        policy,
    };

    if !passable(goal) {
        return Err(unreachable());
    }

    let dist = bfs(grid, goal, passable);
    let mut remaining = dist[index(grid, start)].ok_or_else(unreachable)?;

    let mut cells = Vec::with_capacity(remaining + 1);
    let mut current = start;
    cells.push(current);
    while remaining > 0 {
        // neighbors() is ascending, so the first hit is the smallest
        current = grid
            .neighbors(current)?
            .into_iter()
            .find(|n| dist[index(grid, *n)] == Some(remaining - 1))
            .ok_or_else(unreachable)?;
        cells.push(current);
        remaining -= 1;
    }

    Ok(Path::new(cells))
}

/// Shortest path to whichever of `targets` is closest; ties go to the smallest target
pub fn nearest<K>(
    grid: &Grid,
    knowledge: &K,
    start: Coord,
    targets: &[Coord],
    policy: TraversalPolicy,
) -> EngineResult<Path>
where
    K: KnowledgeView + ?Sized,
{
    grid.check(start)?;
    for target in targets {
        grid.check(*target)?;
    }

    let dist = bfs(grid, start, |c| c == start || policy.allows(knowledge.query(c)));
    let best = targets
        .iter()
        .filter_map(|t| dist[index(grid, *t)].map(|d| (d, *t)))
        .min();

    match best {
        Some((_, target)) => find_path(grid, knowledge, start, target, policy),
        None => Err(EngineError::Unreachable {
            from: start,
            to: targets.iter().min().copied().unwrap_or(start),
            policy,
        }),
    }
}

/// Move counts from `source` to every cell, row-major; `None` where unreachable
pub fn distance_field<K>(
    grid: &Grid,
    knowledge: &K,
    source: Coord,
    policy: TraversalPolicy,
) -> EngineResult<Vec<Option<usize>>>
where
    K: KnowledgeView + ?Sized,
{
    grid.check(source)?;
    Ok(bfs(grid, source, |c| {
        c == source || policy.allows(knowledge.query(c))
    }))
}

fn bfs<F>(grid: &Grid, source: Coord, passable: F) -> Vec<Option<usize>>
where
    F: Fn(Coord) -> bool,
{
    let mut dist = vec![None; grid.rows() * grid.cols()];
    dist[index(grid, source)] = Some(0);

    let mut queue = VecDeque::from([(source, 0usize)]);
    while let Some((current, steps)) = queue.pop_front() {
        let Ok(neighbors) = grid.neighbors(current) else {
            continue;
        };
        for next in neighbors {
            let slot = &mut dist[index(grid, next)];
            if slot.is_none() && passable(next) {
                *slot = Some(steps + 1);
                queue.push_back((next, steps + 1));
            }
        }
    }

    dist
}

fn index(grid: &Grid, coord: Coord) -> usize {
    coord.row * grid.cols() + coord.col
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeStore;
    use crate::models::CellState;

    fn fully_known(grid: &Grid) -> KnowledgeStore {
        let mut store = KnowledgeStore::new();
        for coord in grid.coords().collect::<Vec<_>>() {
            store.observe(coord, grid.query(coord)).unwrap();
        }
        store
    }

    #[test]
    fn test_open_3x3_conservative_tie_break() {
        let grid = Grid::new(3, 3, &[], Coord::new(0, 0), Coord::new(2, 2)).unwrap();
        let knowledge = fully_known(&grid);
        let path = find_path(
            &grid,
            &knowledge,
            grid.start(),
            grid.goal(),
            TraversalPolicy::Conservative,
        )
        .unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(
            path.cells(),
            &[
                Coord::new(0, 0),
                Coord::new(0, 1),
                Coord::new(0, 2),
                Coord::new(1, 2),
                Coord::new(2, 2),
            ]
        );
    }

    #[test]
    fn test_deterministic() {
        let grid = Grid::parse("S....\n.#.#.\n.....\n.#.#G\n").unwrap();
        let knowledge = KnowledgeStore::new();
        let first = find_path(&grid, &knowledge, grid.start(), grid.goal(), TraversalPolicy::Optimistic)
            .unwrap();
        for _ in 0..10 {
            let again =
                find_path(&grid, &knowledge, grid.start(), grid.goal(), TraversalPolicy::Optimistic)
                    .unwrap();
            assert_eq!(again, first);
        }
        assert_eq!(first.moves(), 7);
    }

    #[test]
    fn test_tie_break_after_walls_and_bends() {
        let grid = Grid::parse("S....\n.#.#.\n.....\n.#.#G\n").unwrap();
        let c = Coord::new;
        let expected = [
            c(0, 0),
            c(0, 1),
            c(0, 2),
            c(0, 3),
            c(0, 4),
            c(1, 4),
            c(2, 4),
            c(3, 4),
        ];

        let known = fully_known(&grid);
        let path =
            find_path(&grid, &known, grid.start(), grid.goal(), TraversalPolicy::Conservative)
                .unwrap();
        assert_eq!(path.cells(), &expected);

        let blank = KnowledgeStore::new();
        let path =
            find_path(&grid, &blank, grid.start(), grid.goal(), TraversalPolicy::Optimistic).unwrap();
        assert_eq!(path.cells(), &expected);

        // (2, 0) can go up or right; up is smaller
        let path = find_path(&grid, &known, c(3, 0), c(0, 4), TraversalPolicy::Conservative).unwrap();
        assert_eq!(
            path.cells(),
            &[
                c(3, 0),
                c(2, 0),
                c(1, 0),
                c(0, 0),
                c(0, 1),
                c(0, 2),
                c(0, 3),
                c(0, 4),
            ]
        );
    }

    #[test]
    fn test_walled_off_goal() {
        let grid = Grid::parse("S.#.\n..#G\n").unwrap();
        let knowledge = fully_known(&grid);
        let err = find_path(&grid, &knowledge, grid.start(), grid.goal(), TraversalPolicy::Conservative)
            .unwrap_err();
        assert!(matches!(err, EngineError::Unreachable { .. }));

        // nothing observed yet: optimism walks straight through the hidden wall
        let blank = KnowledgeStore::new();
        let path =
            find_path(&grid, &blank, grid.start(), grid.goal(), TraversalPolicy::Optimistic).unwrap();
        assert_eq!(path.end(), Some(&grid.goal()));
    }

    #[test]
    fn test_conservative_needs_confirmed_cells() {
        let grid = Grid::new(1, 3, &[], Coord::new(0, 0), Coord::new(0, 2)).unwrap();
        let mut knowledge = KnowledgeStore::new();
        knowledge.observe(Coord::new(0, 1), CellState::Open).unwrap();
        assert!(find_path(&grid, &knowledge, grid.start(), grid.goal(), TraversalPolicy::Conservative)
            .is_err());
        knowledge.observe(Coord::new(0, 2), CellState::Open).unwrap();
        let path =
            find_path(&grid, &knowledge, grid.start(), grid.goal(), TraversalPolicy::Conservative)
                .unwrap();
        assert_eq!(path.moves(), 2);
    }

    #[test]
    fn test_start_is_goal() {
        let grid = Grid::new(2, 2, &[], Coord::new(1, 1), Coord::new(0, 0)).unwrap();
        let knowledge = KnowledgeStore::new();
        let path = find_path(
            &grid,
            &knowledge,
            Coord::new(1, 1),
            Coord::new(1, 1),
            TraversalPolicy::Conservative,
        )
        .unwrap();
        assert_eq!(path.cells(), &[Coord::new(1, 1)]);
    }

    #[test]
    fn test_out_of_bounds() {
        let grid = Grid::new(2, 2, &[], Coord::new(0, 0), Coord::new(1, 1)).unwrap();
        let knowledge = KnowledgeStore::new();
        let err = find_path(
            &grid,
            &knowledge,
            Coord::new(0, 0),
            Coord::new(5, 5),
            TraversalPolicy::Optimistic,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::OutOfBounds { .. }));
    }

    #[test]
    fn test_nearest_prefers_closer_then_smaller() {
        let grid = Grid::new(1, 5, &[], Coord::new(0, 2), Coord::new(0, 4)).unwrap();
        let knowledge = KnowledgeStore::new();
        let path = nearest(
            &grid,
            &knowledge,
            Coord::new(0, 2),
            &[Coord::new(0, 4), Coord::new(0, 0), Coord::new(0, 3)],
            TraversalPolicy::Optimistic,
        )
        .unwrap();
        assert_eq!(path.end(), Some(&Coord::new(0, 3)));

        let tie = nearest(
            &grid,
            &knowledge,
            Coord::new(0, 2),
            &[Coord::new(0, 4), Coord::new(0, 0)],
            TraversalPolicy::Optimistic,
        )
        .unwrap();
        assert_eq!(tie.end(), Some(&Coord::new(0, 0)));
    }

    #[test]
    fn test_distance_field() {
        let grid = Grid::parse("S#G\n...\n").unwrap();
        let dist = distance_field(&grid, &grid, grid.start(), TraversalPolicy::Conservative).unwrap();
        assert_eq!(dist[0], Some(0));
        assert_eq!(dist[1], None);
        assert_eq!(dist[2], Some(4));
    }
}
