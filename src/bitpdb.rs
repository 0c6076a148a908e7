//! 4-bit-per-entry differential pattern database, derived from a full
//! [`PatternDb`].

use std::sync::Arc;

use crate::index::{Index, IndexAux};
use crate::pdb::PatternDb;
use crate::puzzle::Puzzle;

/// The modulus every cell is reduced modulo. Fixed rather than
/// configurable: the on-disk reduced form is not meant to round-trip with
/// any other implementation, so there is no reason to parametrize it.
const MODULUS: u8 = 16;

/// A pattern database compressed to `value mod 16` per cell, two cells per
/// byte. Recovering the true distance requires a recent, nearby h-value to
/// resolve the modulus ambiguity — see [`BitPdb::diff_lookup`].
#[derive(Debug)]
pub struct BitPdb {
    aux: Arc<IndexAux>,
    packed: Vec<u8>,
    len: usize,
}

impl BitPdb {
    /// Reduces every cell of `full` to `value mod 16`.
    pub fn from_full(full: &PatternDb) -> Self {
        let bytes = full.as_bytes();
        let len = bytes.len();
        let mut packed = vec![0u8; len.div_ceil(2)];
        for (i, &b) in bytes.iter().enumerate() {
            let reduced = reduce_cell(b);
            let slot = &mut packed[i / 2];
            if i % 2 == 0 {
                *slot = (*slot & 0xf0) | reduced;
            } else {
                *slot = (*slot & 0x0f) | (reduced << 4);
            }
        }
        Self { aux: Arc::clone(full.aux()), packed, len }
    }

    fn nibble(&self, i: usize) -> u8 {
        let byte = self.packed[i / 2];
        if i % 2 == 0 {
            byte & 0x0f
        } else {
            byte >> 4
        }
    }

    /// The `value mod 16` stored for `idx`.
    pub fn lookup(&self, idx: &Index) -> u8 {
        self.nibble(self.aux.flat_index(idx) as usize)
    }

    /// Looks up `p`'s reduced value directly; callers with no prior
    /// h-value to disambiguate against should treat this as a value in
    /// `0..16`, not a true distance.
    pub fn bitpdb_lookup_puzzle(&self, p: &Puzzle) -> u8 {
        self.lookup(&self.aux.compute_index(p))
    }

    /// Recovers the true distance for `p` given `old_h`, a previously
    /// known true h-value for a state within 15 moves of `p`. Contract:
    /// if `old_h` is within 15 of the true value, the recovered value is
    /// exact.
    pub fn diff_lookup(&self, p: &Puzzle, old_h: u8) -> u8 {
        let reduced = self.bitpdb_lookup_puzzle(p);
        nearest_with_residue(old_h, reduced)
    }

    /// The index geometry this database was built with.
    pub fn aux(&self) -> &Arc<IndexAux> {
        &self.aux
    }

    /// Number of entries (not bytes) this database holds.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this database holds zero entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn reduce_cell(value: u8) -> u8 {
    value % MODULUS
}

/// Finds the value nearest to `anchor` whose residue mod 16 is `residue`.
fn nearest_with_residue(anchor: u8, residue: u8) -> u8 {
    let anchor = i32::from(anchor);
    let residue = i32::from(residue);
    let base = anchor - (anchor % i32::from(MODULUS));
    let candidates = [base - i32::from(MODULUS) + residue, base + residue, base + i32::from(MODULUS) + residue];
    candidates
        .into_iter()
        .filter(|&c| c >= 0)
        .min_by_key(|&c| (c - anchor).abs())
        .unwrap_or(residue) as u8
}
