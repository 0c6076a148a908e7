//! Composition of pattern databases into additive heuristic groups and a
//! maximum-over-groups catalogue h-value.

use enum_dispatch::enum_dispatch;
use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::bitpdb::BitPdb;
use crate::error::{Error, Result};
use crate::loader::{self, LoaderOptions};
use crate::pdb::PatternDb;
use crate::puzzle::Puzzle;
use crate::tileset::Tileset;

/// Maximum number of distinct pattern database parts a catalogue may hold.
pub const MAX_PARTS: usize = 64;
/// Maximum number of heuristic groups a catalogue may hold.
pub const MAX_GROUPS: usize = 32;

/// Common query surface for a pattern database, whichever on-disk form it
/// takes.
#[enum_dispatch]
pub trait PdbLookup {
    /// The tileset this part was built for.
    fn tileset(&self) -> Tileset;
    /// The h-value for `p`, computed from scratch.
    fn hval(&self, p: &Puzzle) -> u8;
    /// The h-value for `p`, given a previously known h-value `old_h` for a
    /// nearby state. Full tables ignore `old_h`; bit-packed tables use it
    /// to resolve the modulus ambiguity.
    fn diff_hval(&self, p: &Puzzle, old_h: u8) -> u8;
}

impl PdbLookup for PatternDb {
    fn tileset(&self) -> Tileset {
        self.aux().tileset()
    }

    fn hval(&self, p: &Puzzle) -> u8 {
        self.lookup_puzzle(p)
    }

    fn diff_hval(&self, p: &Puzzle, _old_h: u8) -> u8 {
        self.lookup_puzzle(p)
    }
}

impl PdbLookup for BitPdb {
    fn tileset(&self) -> Tileset {
        self.aux().tileset()
    }

    fn hval(&self, p: &Puzzle) -> u8 {
        self.bitpdb_lookup_puzzle(p)
    }

    fn diff_hval(&self, p: &Puzzle, old_h: u8) -> u8 {
        self.diff_lookup(p, old_h)
    }
}

/// A catalogue entry's on-disk form, dispatched through [`PdbLookup`]
/// rather than a C-style table of `{provider, hval, hdiff, free}`
/// function pointers.
#[derive(Debug)]
#[enum_dispatch(PdbLookup)]
pub enum Heuristic {
    /// A byte-per-entry database, queried directly.
    Full(PatternDb),
    /// A 4-bit differential database, queried relative to a prior h-value.
    Bit(BitPdb),
}

/// One loaded catalogue part: the underlying heuristic plus the board
/// symmetry it was loaded under (queries are pre-transformed through it).
#[derive(Debug)]
pub struct CataloguePart {
    heuristic: Heuristic,
    morph: u8,
}

impl CataloguePart {
    /// Wraps `heuristic`, loaded under board symmetry `morph`.
    pub fn new(heuristic: Heuristic, morph: u8) -> Self {
        Self { heuristic, morph }
    }

    /// The tileset this part's underlying heuristic was built for, under
    /// the board symmetry it was loaded with (see [`tracks`](Self::tracks)
    /// for mapping a real tile identity onto it).
    pub fn tileset(&self) -> Tileset {
        self.heuristic.tileset()
    }

    /// Whether this part's tileset tracks `tile`, under the morphism used
    /// to load it — used to decide which parts a move invalidates.
    pub fn tracks(&self, tile: u8) -> bool {
        self.heuristic.tileset().has(crate::geometry::apply_symmetry(self.morph, tile))
    }

    fn hval(&self, p: &Puzzle) -> u8 {
        self.heuristic.hval(&p.morphed(self.morph))
    }

    fn diff_hval(&self, p: &Puzzle, old_h: u8) -> u8 {
        self.heuristic.diff_hval(&p.morphed(self.morph), old_h)
    }
}

/// A collection of pattern database parts, composed into additive
/// heuristic groups whose maximum is the catalogue's h-value.
pub struct Catalogue {
    parts: Vec<CataloguePart>,
    groups: Vec<Vec<usize>>,
}

impl Catalogue {
    /// Builds an empty catalogue.
    pub fn new() -> Self {
        Self { parts: Vec::new(), groups: Vec::new() }
    }

    /// Registers a part, returning its index for use in
    /// [`add_group`](Self::add_group).
    pub fn add_part(&mut self, part: CataloguePart) -> Result<usize> {
        if self.parts.len() >= MAX_PARTS {
            return Err(Error::Usage(format!("catalogue cannot hold more than {MAX_PARTS} parts")));
        }
        self.parts.push(part);
        Ok(self.parts.len() - 1)
    }

    /// Registers one additive heuristic group over previously-added parts.
    pub fn add_group(&mut self, part_indices: Vec<usize>) -> Result<()> {
        if self.groups.len() >= MAX_GROUPS {
            return Err(Error::Usage(format!("catalogue cannot hold more than {MAX_GROUPS} groups")));
        }
        Ok(self.groups.push(part_indices))
    }

    /// Number of parts registered so far.
    pub fn num_parts(&self) -> usize {
        self.parts.len()
    }

    /// Computes every part's h-value for `p` into `out`, returning the
    /// catalogue h-value (max over groups of the summed parts).
    pub fn partial_hvals(&self, out: &mut [u8; 64], p: &Puzzle) -> u8 {
        for (i, part) in self.parts.iter().enumerate() {
            out[i] = part.hval(p);
        }
        self.max_group_sum(out)
    }

    /// Updates only the parts whose tileset contains `moved_tile`, reusing
    /// `out`'s prior values for the rest; returns the new catalogue
    /// h-value.
    pub fn diff_hvals(&self, out: &mut [u8; 64], p: &Puzzle, moved_tile: u8) -> u8 {
        for (i, part) in self.parts.iter().enumerate() {
            if part.tracks(moved_tile) {
                out[i] = part.diff_hval(p, out[i]);
            }
        }
        self.max_group_sum(out)
    }

    /// Convenience wrapper computing `partial_hvals` into a throwaway
    /// buffer.
    pub fn hval(&self, p: &Puzzle) -> u8 {
        let mut buf = [0u8; 64];
        self.partial_hvals(&mut buf, p)
    }

    /// The catalogue h-value implied by an already-computed partial-hvals
    /// buffer, without re-querying any part.
    pub fn current_hval(&self, out: &[u8; 64]) -> u8 {
        self.max_group_sum(out)
    }

    fn max_group_sum(&self, out: &[u8; 64]) -> u8 {
        self.groups
            .iter()
            .map(|g| g.iter().map(|&i| u32::from(out[i])).sum::<u32>().min(255) as u8)
            .max()
            .unwrap_or(0)
    }

    /// Parses the catalogue text format: one `+`-separated list of
    /// tileset-list strings per line, blank lines and `#` comments
    /// ignored. Each line becomes one additive heuristic group; parts with
    /// an identical tileset-list string across lines are loaded once and
    /// shared.
    pub fn parse_spec<'a>(text: &'a str) -> Result<Vec<Vec<&'a str>>> {
        let mut groups = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split('+').map(str::trim).collect();
            groups.push(parts);
        }
        Ok(groups)
    }

    /// Loads a full catalogue from its text format, opening each distinct
    /// tileset at most once even when the same name appears in more than
    /// one group or repeated within a group.
    pub fn load(dir: &std::path::Path, text: &str, kind: &str, options: LoaderOptions) -> Result<Self> {
        let mut cat = Self::new();
        let mut loaded: FxHashMap<String, usize> = FxHashMap::default();

        for group in Self::parse_spec(text)? {
            let mut indices = Vec::with_capacity(group.len());
            for name in group.into_iter().unique() {
                let idx = match loaded.get(name) {
                    Some(&idx) => idx,
                    None => {
                        let ts = Tileset::from_list_string(name)
                            .ok_or_else(|| Error::Malformed(format!("invalid tileset list {name}")))?;
                        let part = loader::open_heuristic(dir, ts, kind, options, None)?;
                        let idx = cat.add_part(part)?;
                        loaded.insert(name.to_string(), idx);
                        idx
                    }
                };
                indices.push(idx);
            }
            cat.add_group(indices)?;
        }
        Ok(cat)
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexAux;
    use crate::parallel::ParallelDriver;
    use crate::pdb::{NullProgress, PatternDb};
    use std::sync::Arc;

    fn build_part(tiles: &[u8]) -> CataloguePart {
        let ts = Tileset::from_tiles(tiles.iter().copied());
        let aux = Arc::new(IndexAux::new(ts));
        let pdb = PatternDb::allocate(aux);
        pdb.generate(&ParallelDriver::default(), &NullProgress);
        CataloguePart::new(Heuristic::Full(pdb), 0)
    }

    #[test]
    fn hval_is_zero_at_goal() {
        let mut cat = Catalogue::new();
        let p1 = cat.add_part(build_part(&[1, 2])).unwrap();
        let p2 = cat.add_part(build_part(&[3, 4])).unwrap();
        cat.add_group(vec![p1, p2]).unwrap();
        assert_eq!(cat.hval(&Puzzle::solved()), 0);
    }

    #[test]
    fn diff_hvals_matches_partial_hvals_after_a_move() {
        let mut cat = Catalogue::new();
        let p1 = cat.add_part(build_part(&[1, 2])).unwrap();
        let p2 = cat.add_part(build_part(&[3, 4])).unwrap();
        cat.add_group(vec![p1, p2]).unwrap();

        let start = Puzzle::solved();
        let mv = start.legal_moves().next().unwrap();
        let moved_tile = start.tile_at(crate::geometry::step(start.zero_pos(), mv).unwrap());
        let next = start.moved(mv);

        let mut buf = [0u8; 64];
        let from_scratch = cat.partial_hvals(&mut buf, &start);
        assert_eq!(from_scratch, cat.hval(&start));

        let diffed = cat.diff_hvals(&mut buf, &next, moved_tile);
        let mut buf2 = [0u8; 64];
        let fresh = cat.partial_hvals(&mut buf2, &next);
        assert_eq!(diffed, fresh);
        assert_eq!(buf, buf2);
    }

    #[test]
    fn parse_spec_skips_comments_and_blank_lines() {
        let text = "# a comment\n\n01,02+03,04\n\n05,06\n";
        let groups = Catalogue::parse_spec(text).unwrap();
        assert_eq!(groups, vec![vec!["01,02", "03,04"], vec!["05,06"]]);
    }

    #[test]
    fn load_shares_a_repeated_tileset_across_groups() {
        let dir = std::env::temp_dir().join(format!("puzzle24-catalogue-load-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let text = "01,02\n01,02+03,04\n";
        let cat = Catalogue::load(&dir, text, "pdb", LoaderOptions::CREATE).unwrap();
        assert_eq!(cat.num_parts(), 2, "01,02 must be loaded once and shared");

        std::fs::remove_dir_all(&dir).ok();
    }
}
