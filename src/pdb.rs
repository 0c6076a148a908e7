//! Pattern database storage: allocation, memory-mapped loading,
//! parallel breadth-first generation, verification, and the raw on-disk
//! format.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use memmap2::Mmap;

use crate::bitpdb::BitPdb;
use crate::error::{Error, Result};
use crate::index::{Index, IndexAux};
use crate::parallel::ParallelDriver;
use crate::puzzle::Puzzle;

/// Sentinel cell value meaning "not yet reached by the BFS".
pub const UNREACHED: u8 = 255;

/// Sink for generation progress, separate from the `log` records emitted
/// at `debug` level on every round so a caller can assert exact counts
/// without parsing logs.
pub trait PdbProgress: Sync {
    /// Called once after each BFS round, with the number of cells that
    /// round newly reached and the table's total cell count.
    fn round_complete(&self, round: u32, new_cells: u64, total_cells: u64);
}

/// A [`PdbProgress`] that discards everything.
pub struct NullProgress;

impl PdbProgress for NullProgress {
    fn round_complete(&self, _round: u32, _new_cells: u64, _total_cells: u64) {}
}

/// The pattern database's backing memory: either an owned table of atomic
/// cells built and mutated in this process, or a read-only view onto a
/// memory-mapped file. Generation only ever runs against the `Owned`
/// variant (a freshly [`allocate`](PatternDb::allocate)d table); `Mapped`
/// tables are opened purely for lookup, so they expose reads as plain
/// bytes rather than atomics.
#[derive(Debug)]
enum Backing {
    Owned(Vec<AtomicU8>),
    Mapped(Mmap),
}

impl Backing {
    fn len(&self) -> usize {
        match self {
            Self::Owned(cells) => cells.len(),
            Self::Mapped(m) => m.len(),
        }
    }

    fn load_relaxed(&self, offset: u64) -> u8 {
        match self {
            Self::Owned(cells) => cells[offset as usize].load(Ordering::Relaxed),
            Self::Mapped(m) => m[offset as usize],
        }
    }

    fn store_relaxed(&self, offset: u64, value: u8) {
        match self {
            Self::Owned(cells) => cells[offset as usize].store(value, Ordering::Relaxed),
            Self::Mapped(_) => unreachable!("generation only ever runs against an owned table"),
        }
    }

    /// Sets the cell to `new_value` only if it currently holds
    /// [`UNREACHED`]; returns whether it made the change.
    fn cas_if_unreached(&self, offset: u64, new_value: u8) -> bool {
        match self {
            Self::Owned(cells) => cells[offset as usize]
                .compare_exchange(UNREACHED, new_value, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok(),
            Self::Mapped(_) => unreachable!("generation only ever runs against an owned table"),
        }
    }

    /// Copies every cell out as a plain byte vector, for [`PatternDb::store`]
    /// and [`BitPdb::from_full`](crate::bitpdb::BitPdb::from_full).
    fn as_bytes(&self) -> Vec<u8> {
        match self {
            Self::Owned(cells) => cells.iter().map(|c| c.load(Ordering::Relaxed)).collect(),
            Self::Mapped(m) => m.to_vec(),
        }
    }
}

/// A full, byte-per-entry pattern database for one tileset.
#[derive(Debug)]
pub struct PatternDb {
    aux: Arc<IndexAux>,
    backing: Backing,
}

impl PatternDb {
    /// Allocates an owned table, every cell initialised to [`UNREACHED`].
    pub fn allocate(aux: Arc<IndexAux>) -> Self {
        let n = usize::try_from(aux.table_size()).unwrap_or_else(|_| {
            log::error!(
                "pattern database for tileset {} needs {} cells, too large to address",
                aux.tileset(),
                aux.table_size(),
            );
            std::process::abort();
        });
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(n)
            .unwrap_or_else(|e| {
                log::error!("failed to allocate {n} pattern database cells: {e}");
                std::process::abort();
            });
        cells.resize_with(n, || AtomicU8::new(UNREACHED));
        Self { aux, backing: Backing::Owned(cells) }
    }

    /// Opens an existing `.pdb` file for `aux`'s tileset as a read-only
    /// memory mapping.
    pub fn open_mapped(aux: Arc<IndexAux>, path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::NotFound(path.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;
        let mmap = unsafe { Mmap::map(&file)? };
        let expected = aux.table_size();
        if mmap.len() as u64 != expected {
            return Err(Error::Malformed(format!(
                "{}: expected {expected} bytes for tileset {}, found {}",
                path.display(),
                aux.tileset(),
                mmap.len(),
            )));
        }
        Ok(Self { aux, backing: Backing::Mapped(mmap) })
    }

    /// The index geometry this database was built with.
    pub fn aux(&self) -> &Arc<IndexAux> {
        &self.aux
    }

    /// O(1) byte lookup for an already-computed index.
    pub fn lookup(&self, idx: &Index) -> u8 {
        self.backing.load_relaxed(self.aux.flat_index(idx))
    }

    /// Computes `p`'s index under this database's tileset, then looks it
    /// up.
    pub fn lookup_puzzle(&self, p: &Puzzle) -> u8 {
        self.lookup(&self.aux.compute_index(p))
    }

    /// Parallel breadth-first expansion from the solved configuration.
    /// Runs to completion; per-round progress is reported both via
    /// `log::debug!` and through `progress`.
    pub fn generate(&self, driver: &ParallelDriver, progress: &dyn PdbProgress) {
        let total = self.backing.len() as u64;
        let goal = self.aux.compute_index(&Puzzle::solved());
        self.backing.store_relaxed(self.aux.flat_index(&goal), 0);

        let mut round: u32 = 0;
        loop {
            let new_cells = driver.scan_round(total, |offset| {
                if self.backing.load_relaxed(offset) != round as u8 {
                    return 0;
                }
                let idx = self.aux.index_at(offset);
                let mut found = 0u64;
                for succ in self.aux.successors(&idx) {
                    let succ_off = self.aux.flat_index(&succ);
                    if self.backing.cas_if_unreached(succ_off, (round + 1) as u8) {
                        found += 1;
                    }
                }
                found
            });
            log::debug!("pdb generate: round {round} reached {new_cells} new cells of {total}");
            progress.round_complete(round, new_cells, total);
            if new_cells == 0 {
                break;
            }
            round += 1;
        }
    }

    /// For every reached cell with value `d > 0`, confirms some successor
    /// (equivalently, by move reversibility, some predecessor) has value
    /// `d - 1`. Returns a description of the first violation found.
    pub fn verify(&self) -> std::result::Result<(), String> {
        let total = self.backing.len() as u64;
        for offset in 0..total {
            let d = self.backing.load_relaxed(offset);
            if d == 0 || d == UNREACHED {
                continue;
            }
            let idx = self.aux.index_at(offset);
            let ok = self
                .aux
                .successors(&idx)
                .into_iter()
                .any(|s| self.backing.load_relaxed(self.aux.flat_index(&s)) == d - 1);
            if !ok {
                return Err(format!(
                    "cell at offset {offset} has value {d} but no neighbor has value {}",
                    d - 1
                ));
            }
        }
        Ok(())
    }

    /// Reduces this database to its 4-bit differential form.
    pub fn reduce(&self) -> BitPdb {
        BitPdb::from_full(self)
    }

    /// Identified-PDB entries (distance plus which tile identity occupies
    /// each position) are not implemented: no existing file needs
    /// round-trip compatibility with a specific bit layout, and inventing
    /// one here would be unfounded.
    pub fn identify(&self) -> Result<()> {
        Err(Error::Usage("identified pattern databases are not supported".into()))
    }

    /// Writes every maprank's table in ascending order, as raw bytes with
    /// no header.
    pub fn store(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(&self.backing.as_bytes())?;
        Ok(())
    }

    /// Raw bytes, for use by [`BitPdb::from_full`] and tests.
    pub(crate) fn as_bytes(&self) -> Vec<u8> {
        self.backing.as_bytes()
    }
}
