//! Abstract pattern indices: the `(maprank, pidx, eqidx)` triple a pattern
//! database is keyed on, and the expensive one-time geometry needed to
//! compute, invert and enumerate successors of it.

use crate::geometry;
use crate::puzzle::Puzzle;
use crate::rank::{decode_pidx, encode_pidx, factorial, rank_subset, unrank_subset};
use crate::tileset::Tileset;

/// A fully-resolved abstract state for one tileset: which `k`-subset of
/// grid positions the tracked non-zero tiles occupy (`maprank`), how they
/// are permuted onto those positions (`pidx`), and, when the zero tile is
/// tracked, which reachability class of the complement it occupies
/// (`eqidx`, `-1` when the zero tile is not tracked).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    /// Rank of the set of grid positions the tracked non-zero tiles
    /// occupy, among all `C(25, k)` possible such sets.
    pub maprank: u64,
    /// Factorial-base rank of the permutation of tracked tiles onto
    /// `maprank`'s positions.
    pub pidx: u64,
    /// The zero tile's reachability class within `maprank`'s complement,
    /// or `-1` when the zero tile is not tracked.
    pub eqidx: i32,
}

/// The positions reachable by the zero tile, grouped by flood-fill
/// connectivity, for one particular map (set of non-zero tracked tile
/// positions).
#[derive(Debug)]
struct MapClassInfo {
    /// `class_of[pos]` is the class id of `pos` if it is in the
    /// complement of the map, `-1` if `pos` is itself a tracked position.
    class_of: [i32; 25],
    /// For class `c`, the `(complement_pos, tracked_pos)` pairs where
    /// `complement_pos` is a member of class `c` adjacent to the tracked
    /// position `tracked_pos`. Swapping across such a pair is a move that
    /// changes the map.
    border_moves: Vec<Vec<(u8, u8)>>,
}

impl MapClassInfo {
    fn build(map: u32) -> Self {
        let complement = !map & ((1 << 25) - 1);
        let mut class_of = [-1i32; 25];
        let mut border_moves: Vec<Vec<(u8, u8)>> = Vec::new();

        for start in 0..25u8 {
            if complement & (1 << start) == 0 || class_of[start as usize] != -1 {
                continue;
            }
            let class_id = border_moves.len() as i32;
            border_moves.push(Vec::new());
            let mut stack = vec![start];
            class_of[start as usize] = class_id;
            while let Some(p) = stack.pop() {
                for n in geometry::neighbors(p) {
                    if complement & (1 << n) != 0 {
                        if class_of[n as usize] == -1 {
                            class_of[n as usize] = class_id;
                            stack.push(n);
                        }
                    } else {
                        border_moves[class_id as usize].push((p, n));
                    }
                }
            }
        }

        Self { class_of, border_moves }
    }

    fn num_classes(&self) -> usize {
        self.border_moves.len()
    }
}

/// Precomputed geometry for one tileset: for every one of its `C(25, k)`
/// possible maps, the zero-tile reachability classes of that map's
/// complement. Expensive to build; cheap to reuse, so callers are meant to
/// hold this behind an [`std::sync::Arc`] and share it across a pattern
/// database and any catalogue entry using the same tileset.
#[derive(Debug)]
pub struct IndexAux {
    ts: Tileset,
    ts_tiles: Vec<u8>,
    k: usize,
    has_zero: bool,
    class_tables: Vec<MapClassInfo>,
    /// Prefix sums of per-maprank block sizes, length `num_maps(k) + 1`.
    maprank_offsets: Vec<u64>,
}

impl IndexAux {
    /// Builds the full precomputed geometry for `ts`.
    pub fn new(ts: Tileset) -> Self {
        let ts_tiles = ts.non_zero_tiles();
        let k = ts_tiles.len();
        let has_zero = ts.has_zero();
        let n_maps = crate::rank::num_maps(k);

        let mut class_tables = Vec::with_capacity(n_maps as usize);
        let mut maprank_offsets = Vec::with_capacity(n_maps as usize + 1);
        let mut offset = 0u64;
        for r in 0..n_maps {
            let map = unrank_subset(k, r);
            let info = MapClassInfo::build(map);
            maprank_offsets.push(offset);
            let block = factorial(k) * if has_zero { info.num_classes() as u64 } else { 1 };
            offset += block;
            class_tables.push(info);
        }
        maprank_offsets.push(offset);

        Self {
            ts,
            ts_tiles,
            k,
            has_zero,
            class_tables,
            maprank_offsets,
        }
    }

    /// The tileset this geometry was built for.
    pub fn tileset(&self) -> Tileset {
        self.ts
    }

    /// Number of non-zero tiles tracked.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Whether the zero tile is tracked.
    pub fn has_zero(&self) -> bool {
        self.has_zero
    }

    /// Total number of distinct table slots this tileset's pattern
    /// database needs.
    pub fn table_size(&self) -> u64 {
        *self.maprank_offsets.last().unwrap_or(&0)
    }

    /// Computes the abstract index of `puzzle` under this tileset.
    pub fn compute_index(&self, puzzle: &Puzzle) -> Index {
        let positions = puzzle.positions();
        let map = Self::map_bits(&self.ts_tiles, positions);
        let maprank = rank_subset(map);
        let pidx = encode_pidx(&self.ts_tiles, map, positions);
        let eqidx = if self.has_zero {
            self.class_tables[maprank as usize].class_of[puzzle.zero_pos() as usize]
        } else {
            -1
        };
        Index { maprank, pidx, eqidx }
    }

    /// Inverts an [`Index`]: returns the tracked non-zero tiles' grid
    /// positions (`255` for untracked entries), and the set of grid
    /// positions the zero tile could occupy consistently with this index
    /// (a singleton class when it has one member, the whole complement
    /// when the zero tile is untracked).
    pub fn invert_index(&self, idx: &Index) -> ([u8; 25], Vec<u8>) {
        let map = unrank_subset(self.k, idx.maprank);
        let positions = decode_pidx(&self.ts_tiles, map, idx.pidx);
        let classes = &self.class_tables[idx.maprank as usize];
        let candidates = if self.has_zero {
            (0..25u8)
                .filter(|&p| classes.class_of[p as usize] == idx.eqidx)
                .collect()
        } else {
            (0..25u8)
                .filter(|&p| map & (1 << p) == 0)
                .collect()
        };
        (positions, candidates)
    }

    /// Enumerates every abstract successor of `idx` reachable by a single
    /// real puzzle move. When the zero tile is tracked this only
    /// considers moves out of `idx`'s own reachability class (the zero
    /// tile's exact class is known); otherwise every class is tried,
    /// since any of them may hold the true state.
    pub fn successors(&self, idx: &Index) -> Vec<Index> {
        let map = unrank_subset(self.k, idx.maprank);
        let positions = decode_pidx(&self.ts_tiles, map, idx.pidx);
        let classes = &self.class_tables[idx.maprank as usize];

        let relevant: Vec<usize> = if self.has_zero {
            vec![idx.eqidx as usize]
        } else {
            (0..classes.num_classes()).collect()
        };

        let mut out = Vec::new();
        for cid in relevant {
            for &(comp_pos, tracked_pos) in &classes.border_moves[cid] {
                let moved_tile = self
                    .ts_tiles
                    .iter()
                    .copied()
                    .find(|&t| positions[t as usize] == tracked_pos)
                    .expect("border move points at an untracked position");

                let new_map = (map & !(1 << tracked_pos)) | (1 << comp_pos);
                let mut new_positions = positions;
                new_positions[moved_tile as usize] = comp_pos;

                let new_maprank = rank_subset(new_map);
                let new_pidx = encode_pidx(&self.ts_tiles, new_map, &new_positions);
                let new_eqidx = if self.has_zero {
                    self.class_tables[new_maprank as usize].class_of[tracked_pos as usize]
                } else {
                    -1
                };
                out.push(Index {
                    maprank: new_maprank,
                    pidx: new_pidx,
                    eqidx: new_eqidx,
                });
            }
        }
        out
    }

    /// Flattens `idx` into a single table offset in `0..table_size()`.
    pub fn flat_index(&self, idx: &Index) -> u64 {
        let base = self.maprank_offsets[idx.maprank as usize];
        if self.has_zero {
            let classes = self.class_tables[idx.maprank as usize].num_classes() as u64;
            base + idx.pidx * classes + idx.eqidx as u64
        } else {
            base + idx.pidx
        }
    }

    /// The number of maprank blocks, i.e. `C(25, k)`.
    pub fn num_maps(&self) -> u64 {
        self.class_tables.len() as u64
    }

    /// Inverts [`flat_index`](Self::flat_index): recovers the `Index`
    /// occupying a given table offset.
    pub fn index_at(&self, offset: u64) -> Index {
        let maprank = match self.maprank_offsets.binary_search(&offset) {
            Ok(i) => i as u64,
            Err(i) => (i - 1) as u64,
        };
        let base = self.maprank_offsets[maprank as usize];
        let rem = offset - base;
        if self.has_zero {
            let classes = self.class_tables[maprank as usize].num_classes() as u64;
            Index {
                maprank,
                pidx: rem / classes,
                eqidx: (rem % classes) as i32,
            }
        } else {
            Index { maprank, pidx: rem, eqidx: -1 }
        }
    }

    /// Builds a full, concrete [`Puzzle`] consistent with `idx`: the zero
    /// tile is placed at the lexicographically smallest position in its
    /// equivalence class, and tiles outside this tileset fill the
    /// remaining positions in ascending order.
    pub fn invert_index_to_puzzle(&self, idx: &Index) -> Puzzle {
        let (positions, zero_candidates) = self.invert_index(idx);
        let mut grid = [u8::MAX; 25];
        for &t in &self.ts_tiles {
            grid[positions[t as usize] as usize] = t;
        }
        let zero_pos = zero_candidates.into_iter().min().unwrap_or(0);
        grid[zero_pos as usize] = 0;

        let mut next_free_tile = 1u8;
        for slot in &mut grid {
            if *slot == u8::MAX {
                while self.ts.has(next_free_tile) || next_free_tile == 0 {
                    next_free_tile += 1;
                }
                *slot = next_free_tile;
                next_free_tile += 1;
            }
        }
        Puzzle::from_grid(grid)
    }

    fn map_bits(ts_tiles: &[u8], positions: &[u8; 25]) -> u32 {
        let mut bits = 0u32;
        for &t in ts_tiles {
            bits |= 1 << positions[t as usize];
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solved_state_round_trips() {
        let ts = Tileset::from_tiles([1, 2, 3]);
        let aux = IndexAux::new(ts);
        let puzzle = Puzzle::solved();
        let idx = aux.compute_index(&puzzle);
        let (positions, _) = aux.invert_index(&idx);
        for t in [1u8, 2, 3] {
            assert_eq!(positions[t as usize], t);
        }
    }

    #[test]
    fn flat_index_is_injective_over_reachable_states() {
        let ts = Tileset::from_tiles([1, 2]);
        let aux = IndexAux::new(ts);
        let mut seen = std::collections::HashSet::new();
        let mut frontier = vec![aux.compute_index(&Puzzle::solved())];
        let mut visited = std::collections::HashSet::new();
        for _ in 0..4 {
            let mut next = Vec::new();
            for idx in &frontier {
                let key = (idx.maprank, idx.pidx, idx.eqidx);
                if !visited.insert(key) {
                    continue;
                }
                assert!(seen.insert(aux.flat_index(idx)));
                next.extend(aux.successors(idx));
            }
            frontier = next;
        }
    }

    #[test]
    fn has_zero_tracks_an_exact_class() {
        let ts = Tileset::from_tiles([0, 1, 2]);
        let aux = IndexAux::new(ts);
        assert!(aux.has_zero());
        let idx = aux.compute_index(&Puzzle::solved());
        assert!(idx.eqidx >= 0);
    }

    #[test]
    fn table_size_matches_maprank_block_sum() {
        let ts = Tileset::from_tiles([1, 2]);
        let aux = IndexAux::new(ts);
        assert_eq!(aux.table_size(), aux.num_maps() * factorial(2));
    }
}
