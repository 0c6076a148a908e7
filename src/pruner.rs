//! Move pruning: a finite-state filter over move sequences, rejecting
//! redundant ones before IDA* ever expands them.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::geometry::Direction;

/// A move sequence the FSM has determined is equivalent to a shorter one.
pub const FSM_MATCH: u16 = 0xffff;
/// A transition slot the generator never filled in; the loader treats it
/// as a self-loop (accept, no state change) rather than a guess.
pub const FSM_UNASSIGNED: u16 = 0xfffe;
/// The state every search begins in.
pub const FSM_BEGIN: u16 = 0;

/// A pluggable move filter. `transition` is given the zero tile's current
/// position (`FSM_BEGIN` and all per-position tables are indexed the same
/// way) and the candidate move; `None` rejects it.
pub trait MovePruner {
    /// The state a search begins in.
    fn initial_state(&self) -> u32;
    /// Given the current state, the zero tile's position, and a candidate
    /// move, returns the next state, or `None` to reject the move.
    fn transition(&self, state: u32, zero_pos: u8, mv: Direction) -> Option<u32>;
}

/// Accepts every move.
pub struct FsmDummy;

impl MovePruner for FsmDummy {
    fn initial_state(&self) -> u32 {
        0
    }

    fn transition(&self, _state: u32, _zero_pos: u8, _mv: Direction) -> Option<u32> {
        Some(0)
    }
}

/// Rejects only the immediate reversal of the previous move; the state is
/// the last move taken, or 4 ("none yet").
pub struct FsmSimple;

const NO_LAST_MOVE: u32 = 4;

impl MovePruner for FsmSimple {
    fn initial_state(&self) -> u32 {
        NO_LAST_MOVE
    }

    fn transition(&self, state: u32, _zero_pos: u8, mv: Direction) -> Option<u32> {
        if state != NO_LAST_MOVE {
            let last = Direction::ALL[state as usize];
            if mv == last.opposite() {
                return None;
            }
        }
        Some(mv.index() as u32)
    }
}

/// A richer FSM loaded from file: one transition table per zero-tile
/// position, each a list of states with one next-state entry per
/// direction.
pub struct Fsm {
    tables: Vec<Vec<[u16; 4]>>,
}

impl Fsm {
    /// Parses the 25-entry `(length, offset)` header followed by the
    /// per-position state tables.
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        const HEADER_LEN: usize = 25 * 8;
        if bytes.len() < HEADER_LEN {
            return Err(Error::Malformed(format!("{}: file shorter than FSM header", path.display())));
        }

        let mut tables = Vec::with_capacity(25);
        for pos in 0..25usize {
            let entry = &bytes[pos * 8..pos * 8 + 8];
            let length = u32::from_le_bytes(entry[0..4].try_into().unwrap()) as usize;
            let offset = u32::from_le_bytes(entry[4..8].try_into().unwrap()) as usize;

            let start = HEADER_LEN + offset;
            let needed = length * 8;
            let end = start
                .checked_add(needed)
                .filter(|&e| e <= bytes.len())
                .ok_or_else(|| Error::Malformed(format!("{}: table for position {pos} out of bounds", path.display())))?;

            let mut rows = Vec::with_capacity(length);
            for row_bytes in bytes[start..end].chunks_exact(8) {
                let mut row = [0u16; 4];
                for (d, chunk) in row.iter_mut().zip(row_bytes.chunks_exact(2)) {
                    *d = u16::from_le_bytes(chunk.try_into().unwrap());
                }
                rows.push(row);
            }
            tables.push(rows);
        }

        Ok(Self { tables })
    }

    /// Writes this FSM back out in the same format `load` reads.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut body = Vec::new();
        let mut header = Vec::with_capacity(25 * 8);
        for table in &self.tables {
            let offset = body.len() as u32;
            header.extend_from_slice(&(table.len() as u32).to_le_bytes());
            header.extend_from_slice(&offset.to_le_bytes());
            for row in table {
                for &entry in row {
                    body.extend_from_slice(&entry.to_le_bytes());
                }
            }
        }

        let mut file = File::create(path)?;
        file.write_all(&header)?;
        file.write_all(&body)?;
        Ok(())
    }

    /// Builds an FSM directly from per-position tables (used by tests and
    /// anything that synthesizes one in-process rather than loading a
    /// file).
    pub fn from_tables(tables: Vec<Vec<[u16; 4]>>) -> Self {
        Self { tables }
    }
}

impl MovePruner for Fsm {
    fn initial_state(&self) -> u32 {
        u32::from(FSM_BEGIN)
    }

    fn transition(&self, state: u32, zero_pos: u8, mv: Direction) -> Option<u32> {
        let row = self.tables[zero_pos as usize].get(state as usize)?;
        match row[mv.index()] {
            FSM_MATCH => None,
            FSM_UNASSIGNED => Some(state),
            next => Some(u32::from(next)),
        }
    }
}
