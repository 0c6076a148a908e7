//! Thread-pool primitive for chunked range iteration over a pattern
//! database's cells.

/// Upper bound on the worker-count field; mirrors the historical
/// process-wide `pdb_jobs` cap.
pub const PDB_MAX_JOBS: usize = 256;

/// An explicit, per-call worker count for pattern database construction
/// and verification, replacing a process-wide global.
#[derive(Debug, Clone, Copy)]
pub struct ParallelDriver {
    /// Number of worker threads `scan_round` spreads each round across.
    pub jobs: usize,
}

impl Default for ParallelDriver {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}

impl ParallelDriver {
    /// Builds a driver with `jobs` workers, clamped to `[1, PDB_MAX_JOBS]`.
    pub fn new(jobs: usize) -> Self {
        Self { jobs: jobs.clamp(1, PDB_MAX_JOBS) }
    }

    /// Splits `0..n` across this driver's worker pool, applying `f` to
    /// every index and summing the results. Used by PDB generation to
    /// scan a round's cells and count how many successors were newly
    /// reached.
    ///
    /// Any panic inside `f` propagates and aborts the scan; worker
    /// failure during PDB construction is fatal per the concurrency
    /// model, so no partial result is produced.
    pub fn scan_round<F>(&self, n: u64, f: F) -> u64
    where
        F: Fn(u64) -> u64 + Sync + Send,
    {
        use rayon::prelude::*;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .unwrap_or_else(|e| {
                log::error!("failed to start {} worker threads: {e}", self.jobs);
                std::process::abort();
            });
        pool.install(|| (0..n).into_par_iter().map(f).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_round_visits_every_index_once() {
        let driver = ParallelDriver::new(4);
        let total = driver.scan_round(1000, |_| 1);
        assert_eq!(total, 1000);
    }

    #[test]
    fn default_is_single_threaded() {
        assert_eq!(ParallelDriver::default().jobs, 1);
    }

    #[test]
    fn new_clamps_to_max_jobs() {
        assert_eq!(ParallelDriver::new(10_000).jobs, PDB_MAX_JOBS);
        assert_eq!(ParallelDriver::new(0).jobs, 1);
    }
}
