//! Opens, maps or creates the pattern database backing one tileset,
//! applying the canonical morphism and the exact/similar/create fallback
//! chain.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bitflags::bitflags;

use crate::catalogue::{CataloguePart, Heuristic};
use crate::error::{Error, Result};
use crate::index::IndexAux;
use crate::parallel::ParallelDriver;
use crate::pdb::{NullProgress, PatternDb, PdbProgress};
use crate::tileset::{Tileset, ZERO_TILE};

bitflags! {
    /// Recognised loader options, replacing a variadic flags integer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LoaderOptions: u8 {
        /// Build and persist the database if no file is found.
        const CREATE = 0b0001;
        /// Log each step taken while searching for a match.
        const VERBOSE = 0b0010;
        /// Do not replace the tileset by its canonical morphism.
        const NOMORPH = 0b0100;
        /// Accept a "similar" representation (bit-packed for full or
        /// vice versa) when an exact type match is not found.
        const SIMILAR = 0b1000;
    }
}

/// File-name suffix for each heuristic kind this crate supports.
fn suffix_for(kind: &str) -> Result<&'static str> {
    match kind {
        "pdb" => Ok("pdb"),
        "bpdb" => Ok("bpdb"),
        other => Err(Error::Usage(format!("unknown heuristic type {other}"))),
    }
}

fn similar_kind(kind: &str) -> Option<&'static str> {
    match kind {
        "pdb" => Some("bpdb"),
        "bpdb" => Some("pdb"),
        _ => None,
    }
}

fn try_open(full_ts: Tileset, path: &Path, kind: &str) -> Result<Heuristic> {
    let aux = Arc::new(IndexAux::new(full_ts));
    match kind {
        "pdb" => PatternDb::open_mapped(aux, path).map(Heuristic::Full),
        "bpdb" => Err(Error::NotFound(path.display().to_string())),
        other => Err(Error::Usage(format!("unknown heuristic type {other}"))),
    }
}

/// Opens (or creates) the database for `requested`, following section
/// 4.7's exact-then-similar-then-create-then-fail order.
pub fn open_heuristic(
    dir: &Path,
    requested: Tileset,
    kind: &str,
    options: LoaderOptions,
    progress: Option<&dyn PdbProgress>,
) -> Result<CataloguePart> {
    suffix_for(kind)?;

    let has_zero = requested.has_zero();
    let stripped = requested.remove(ZERO_TILE);
    let (named, morph) = if options.contains(LoaderOptions::NOMORPH) {
        (stripped, 0)
    } else {
        stripped.canonicalize()
    };
    let full_ts = if has_zero { named.add(ZERO_TILE) } else { named };
    let name = named.to_list_string();

    let try_kind = |k: &str| -> Result<Heuristic> {
        let path = file_path(dir, &name, k);
        if options.contains(LoaderOptions::VERBOSE) {
            log::info!("heuristic loader: trying {}", path.display());
        }
        try_open(full_ts, &path, k)
    };

    match try_kind(kind) {
        Ok(h) => return Ok(CataloguePart::new(h, morph)),
        Err(Error::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    if options.contains(LoaderOptions::SIMILAR) {
        if let Some(alt) = similar_kind(kind) {
            match try_kind(alt) {
                Ok(h) => return Ok(CataloguePart::new(h, morph)),
                Err(Error::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
    }

    if options.contains(LoaderOptions::CREATE) {
        let aux = Arc::new(IndexAux::new(full_ts));
        let pdb = PatternDb::allocate(aux);
        pdb.generate(&ParallelDriver::default(), progress.unwrap_or(&NullProgress));
        if options.contains(LoaderOptions::VERBOSE) {
            log::info!("heuristic loader: generated pattern database for tileset {full_ts}");
        }

        let heuristic = match kind {
            "pdb" => {
                let path = file_path(dir, &name, "pdb");
                if let Err(e) = pdb.store(&path) {
                    log::warn!("heuristic loader: failed to persist {}: {e}", path.display());
                }
                Heuristic::Full(pdb)
            }
            "bpdb" => Heuristic::Bit(pdb.reduce()),
            other => return Err(Error::Usage(format!("unknown heuristic type {other}"))),
        };
        return Ok(CataloguePart::new(heuristic, morph));
    }

    Err(Error::NotFound(format!("{}.{}", name, suffix_for(kind)?)))
}

fn file_path(dir: &Path, name: &str, kind: &str) -> PathBuf {
    dir.join(format!("{name}.{kind}"))
}
