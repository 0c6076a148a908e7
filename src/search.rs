//! IDA* search driven by a catalogue's admissible heuristic, with an
//! FSM-based move pruner and differential h-value updates.

use crate::catalogue::Catalogue;
use crate::geometry;
use crate::pruner::MovePruner;
use crate::puzzle::{Move, Puzzle};

/// The result of a completed search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A shortest move sequence from the root to the goal.
    Solved(Vec<Move>),
    /// No move sequence reaches the goal.
    Unsolvable,
}

enum DfsResult {
    Found,
    Exceeded,
}

/// Runs iterative-deepening A* from `root` using `cat`'s heuristic and
/// `pruner` to reject redundant move sequences.
pub fn ida_star(cat: &Catalogue, root: &Puzzle, pruner: &dyn MovePruner) -> SearchOutcome {
    let mut puzzle = root.clone();
    let mut partial = [0u8; 64];
    let h0 = cat.partial_hvals(&mut partial, &puzzle);
    let mut bound = u32::from(h0);

    loop {
        let mut path = Vec::new();
        let mut next_bound = u32::MAX;
        let result = dfs(
            cat,
            &mut puzzle,
            &mut partial,
            0,
            bound,
            h0,
            None,
            pruner.initial_state(),
            pruner,
            &mut path,
            &mut next_bound,
        );
        match result {
            DfsResult::Found => return SearchOutcome::Solved(path),
            DfsResult::Exceeded => {
                if next_bound == u32::MAX {
                    return SearchOutcome::Unsolvable;
                }
                bound = next_bound;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn dfs(
    cat: &Catalogue,
    puzzle: &mut Puzzle,
    partial: &mut [u8; 64],
    g: u32,
    bound: u32,
    h: u8,
    last_move: Option<Move>,
    fsm_state: u32,
    pruner: &dyn MovePruner,
    path: &mut Vec<Move>,
    next_bound: &mut u32,
) -> DfsResult {
    let f = g + u32::from(h);
    if f > bound {
        *next_bound = (*next_bound).min(f);
        return DfsResult::Exceeded;
    }
    if h == 0 && puzzle.is_solved() {
        return DfsResult::Found;
    }

    for mv in puzzle.legal_moves().collect::<Vec<_>>() {
        if last_move.is_some_and(|lm| lm.opposite() == mv) {
            continue;
        }
        let Some(next_state) = pruner.transition(fsm_state, puzzle.zero_pos(), mv) else {
            continue;
        };

        let dest = geometry::step(puzzle.zero_pos(), mv).expect("legal move has a destination");
        let moved_tile = puzzle.tile_at(dest);
        let saved = *partial;

        puzzle.apply(mv);
        let new_h = cat.diff_hvals(partial, puzzle, moved_tile);
        path.push(mv);

        let result = dfs(
            cat,
            puzzle,
            partial,
            g + 1,
            bound,
            new_h,
            Some(mv),
            next_state,
            pruner,
            path,
            next_bound,
        );
        if matches!(result, DfsResult::Found) {
            return DfsResult::Found;
        }

        path.pop();
        puzzle.apply(mv.opposite());
        *partial = saved;
    }

    DfsResult::Exceeded
}
