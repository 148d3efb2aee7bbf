// Integration tests for exploration sessions
// Tests generated mazes end to end and resuming from exported knowledge

use anyhow::Result;
use mazekeeper::grid::generate::{generate, GeneratorOptions};
use mazekeeper::grid::Grid;
use mazekeeper::knowledge::export;
use mazekeeper::models::{Coord, TraversalPolicy};
use mazekeeper::session::{Outcome, Session, SessionEvent, SessionState};

fn seeded(seed: u64, keys: usize) -> Result<Grid> {
    Ok(generate(&GeneratorOptions {
        rows: 15,
        cols: 21,
        keys,
        seed: Some(seed),
    })?)
}

fn assert_walk_is_legal(grid: &Grid, trail: &[Coord]) {
    for pair in trail.windows(2) {
        assert!(
            pair[0].direction_to(&pair[1]).is_some(),
            "{} -> {} is not a single step",
            pair[0],
            pair[1]
        );
    }
    for coord in trail {
        assert!(!grid.cell_at(*coord).unwrap().is_wall(), "walked into {}", coord);
    }
}

#[test]
fn test_optimistic_solves_generated_mazes() -> Result<()> {
    for seed in [1, 7, 42, 1234] {
        let grid = seeded(seed, 3)?;
        let mut session = Session::create(grid.clone(), None, TraversalPolicy::Optimistic)?;
        let state = session.run(100_000)?.clone();

        assert!(
            matches!(state, SessionState::Finished(Outcome::Success { .. })),
            "seed {} ended with {}",
            seed,
            state
        );
        assert_eq!(session.position(), grid.goal());
        assert_eq!(session.keys_collected().count(), grid.keys().len());
        assert_eq!(session.trail().len(), session.moves() + 1);
        assert_walk_is_legal(&grid, session.trail());
    }
    Ok(())
}

#[test]
fn test_knowledge_only_grows_during_a_session() -> Result<()> {
    let grid = seeded(99, 2)?;
    let mut session = Session::create(grid, None, TraversalPolicy::Optimistic)?;

    let mut known = 0;
    while !session.state().is_finished() {
        session.step()?;
        let now = session.knowledge().len();
        assert!(now >= known);
        known = now;
    }
    Ok(())
}

#[test]
fn test_resume_from_exported_knowledge() -> Result<()> {
    let grid = seeded(5, 2)?;

    let mut first = Session::create(grid.clone(), None, TraversalPolicy::Optimistic)?;
    first.run(100_000)?;
    assert!(first.state().is_finished());
    let text = first.export_knowledge()?;

    // Everything needed is now known open, so the careful policy succeeds too
    let imported = export::import(&text)?;
    assert_eq!(imported, first.knowledge());
    let mut second = Session::create(grid.clone(), Some(imported), TraversalPolicy::Conservative)?;
    let state = second.run(100_000)?.clone();
    assert!(
        matches!(state, SessionState::Finished(Outcome::Success { .. })),
        "resumed session ended with {}",
        state
    );
    assert_walk_is_legal(&grid, second.trail());
    Ok(())
}

#[test]
fn test_conservative_without_knowledge_gives_up() -> Result<()> {
    let grid = seeded(3, 0)?;
    let mut session = Session::create(grid, None, TraversalPolicy::Conservative)?;
    let state = session.run(100)?.clone();

    // Only the start's neighbours are known, the goal is not
    match state {
        SessionState::Finished(Outcome::Failure(_)) => {}
        SessionState::Finished(Outcome::Success { moves }) => assert!(moves <= 1),
        other => panic!("unexpected state {}", other),
    }
    Ok(())
}

#[test]
fn test_event_history_is_ordered() -> Result<()> {
    let grid = Grid::parse("S.#\n..#\n#.G\n")?;
    let mut session = Session::create(grid, None, TraversalPolicy::Optimistic)?;
    session.run(1_000)?;

    let events = session.events();
    assert_eq!(events.first(), Some(&SessionEvent::Started(Coord::new(0, 0))));
    assert!(matches!(events.last(), Some(SessionEvent::Finished(Outcome::Success { .. }))));

    let moves = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Moved { .. }))
        .count();
    assert_eq!(moves, session.moves());
    Ok(())
}
