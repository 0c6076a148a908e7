//! Combinatorial rank/unrank of k-subsets of a 25-element universe, and the
//! factorial-base (Lehmer code) encoding used for the permutation index.

use std::sync::OnceLock;

const UNIVERSE: usize = 25;

/// Pascal's-triangle table of binomial coefficients `C(n, k)` for
/// `0 <= n, k <= 25`, computed once and shared.
struct BinomialTable {
    table: [[u64; UNIVERSE + 1]; UNIVERSE + 1],
}

impl BinomialTable {
    fn new() -> Self {
        let mut table = [[0u64; UNIVERSE + 1]; UNIVERSE + 1];
        for n in 0..=UNIVERSE {
            table[n][0] = 1;
            for k in 1..=n {
                table[n][k] = table[n - 1][k - 1] + table[n - 1].get(k).copied().unwrap_or(0);
            }
        }
        Self { table }
    }

    fn get(&self, n: usize, k: usize) -> u64 {
        if k > n {
            0
        } else {
            self.table[n][k]
        }
    }
}

static BINOMIALS: OnceLock<BinomialTable> = OnceLock::new();

/// `C(n, k)`, the number of k-subsets of an n-set.
pub fn binomial(n: usize, k: usize) -> u64 {
    BINOMIALS.get_or_init(BinomialTable::new).get(n, k)
}

/// `C(25, k)`, the number of maps for a tileset with `k` tracked non-zero
/// tiles.
pub fn num_maps(k: usize) -> u64 {
    binomial(UNIVERSE, k)
}

const MAX_FACTORIAL: usize = 20;

static FACTORIALS: OnceLock<[u64; MAX_FACTORIAL + 1]> = OnceLock::new();

/// `n!`, for `n <= 20` (the largest value that fits in a `u64`).
pub fn factorial(n: usize) -> u64 {
    let table = FACTORIALS.get_or_init(|| {
        let mut t = [1u64; MAX_FACTORIAL + 1];
        for i in 1..=MAX_FACTORIAL {
            t[i] = t[i - 1] * i as u64;
        }
        t
    });
    table[n]
}

/// Ranks a k-subset of `{0, .., 24}`, given as a bitmask, in the standard
/// combinatorial number system: for the descending enumeration
/// `c_1 > c_2 > .. > c_k` of set bits, `rank = sum_i C(c_i, k - i + 1)`.
///
/// O(k).
pub fn rank_subset(bits: u32) -> u64 {
    let mut remaining = bits;
    let mut i = remaining.count_ones();
    let mut rank = 0u64;
    while remaining != 0 {
        let pos = 31 - remaining.leading_zeros();
        rank += binomial(pos as usize, i as usize);
        remaining &= !(1 << pos);
        i -= 1;
    }
    rank
}

/// Inverts [`rank_subset`]: returns the bitmask of the `r`-th k-subset of
/// `{0, .., 24}` in colex order.
///
/// O(k).
pub fn unrank_subset(k: usize, mut r: u64) -> u32 {
    let mut bits = 0u32;
    let mut search_from: i32 = UNIVERSE as i32 - 1;
    let mut i = k;
    while i > 0 {
        let mut pos = search_from;
        while pos >= 0 && binomial(pos as usize, i) > r {
            pos -= 1;
        }
        debug_assert!(pos >= 0, "unrank_subset: r out of range for k={k}");
        bits |= 1 << pos;
        r -= binomial(pos as usize, i);
        search_from = pos - 1;
        i -= 1;
    }
    bits
}

/// Returns the position of the `n`-th (0-indexed) set bit of `mask`,
/// scanning from the least significant bit.
fn nth_set_bit(mask: u32, n: usize) -> u8 {
    let mut remaining = mask;
    let mut skip = n;
    loop {
        let pos = remaining.trailing_zeros();
        if skip == 0 {
            return pos as u8;
        }
        remaining &= !(1 << pos);
        skip -= 1;
    }
}

/// Encodes which of the `map`'s `k` positions each tile in `ts_tiles`
/// (ascending tile number) occupies as a factorial-base number in
/// `[0, k!)`, per the inversion-count scheme of section 4.2.
///
/// `positions[tile]` must give tile `tile`'s grid position for every tile
/// in `ts_tiles`; other entries are ignored.
pub fn encode_pidx(ts_tiles: &[u8], map: u32, positions: &[u8; 25]) -> u64 {
    let mut working = map;
    let mut pidx = 0u64;
    for &tile in ts_tiles {
        let pos = positions[tile as usize];
        let less_mask = working & ((1u32 << pos) - 1);
        let digit = u64::from(less_mask.count_ones());
        let remaining = u64::from(working.count_ones());
        pidx = pidx * remaining + digit;
        working &= !(1u32 << pos);
    }
    pidx
}

/// Inverts [`encode_pidx`]: returns the grid position of every tile in
/// `ts_tiles`, written into the matching `positions[tile]` slots (all
/// other entries are left at `255`, a sentinel for "not tracked").
pub fn decode_pidx(ts_tiles: &[u8], map: u32, pidx: u64) -> [u8; 25] {
    let k = ts_tiles.len();
    let mut digits = vec![0u64; k];
    let mut val = pidx;
    for i in (1..k).rev() {
        let radix = (k - i) as u64;
        digits[i] = val % radix;
        val /= radix;
    }
    if k > 0 {
        digits[0] = val;
    }

    let mut positions = [255u8; 25];
    let mut working = map;
    for (i, &tile) in ts_tiles.iter().enumerate() {
        let pos = nth_set_bit(working, digits[i] as usize);
        positions[tile as usize] = pos;
        working &= !(1u32 << pos);
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64;

    #[test]
    fn rank_unrank_round_trip_exhaustive_small_k() {
        for k in 0..=3 {
            let n = num_maps(k);
            for r in 0..n {
                let bits = unrank_subset(k, r);
                assert_eq!(bits.count_ones() as usize, k);
                assert_eq!(rank_subset(bits), r);
            }
        }
    }

    #[test]
    fn rank_unrank_round_trip_random() {
        let mut rng = Pcg64::seed_from_u64(42);
        for _ in 0..2000 {
            let k = rng.gen_range(0..=10);
            let n = num_maps(k);
            let r = rng.gen_range(0..n);
            let bits = unrank_subset(k, r);
            assert_eq!(rank_subset(bits), r);
        }
    }

    #[test]
    fn pidx_round_trip() {
        let ts_tiles = [1u8, 2, 5, 6];
        let map: u32 = (1 << 1) | (1 << 2) | (1 << 5) | (1 << 6);
        let mut positions = [255u8; 25];
        positions[1] = 6;
        positions[2] = 1;
        positions[5] = 2;
        positions[6] = 5;

        let pidx = encode_pidx(&ts_tiles, map, &positions);
        assert!(pidx < factorial(4));
        let decoded = decode_pidx(&ts_tiles, map, pidx);
        for &t in &ts_tiles {
            assert_eq!(decoded[t as usize], positions[t as usize]);
        }
    }

    #[test]
    fn pidx_covers_full_range() {
        let ts_tiles = [0u8, 1, 2];
        let map: u32 = 0b111;
        let mut seen = std::collections::HashSet::new();
        // enumerate all 3! assignments of {0,1,2} onto positions {0,1,2}
        for perm in [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ] {
            let mut positions = [255u8; 25];
            for (tile, &pos) in ts_tiles.iter().zip(perm.iter()) {
                positions[*tile as usize] = pos;
            }
            let pidx = encode_pidx(&ts_tiles, map, &positions);
            assert!(seen.insert(pidx));
        }
        assert_eq!(seen.len(), 6);
    }
}
