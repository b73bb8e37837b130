//! Concurrency helpers.
//!
//! These drive many threads at one store to check that per-parent id
//! allocation never hands out the same value twice.

use devicestore_core::model::Zone;
use devicestore_core::{DeviceManagement, EntityStore, StoreResult};
use std::collections::HashSet;
use std::hash::Hash;
use std::thread;
use std::time::{Duration, Instant};

use crate::fixtures::requests;

/// Outcome of a concurrent run.
#[derive(Debug, Clone)]
pub struct ConcurrentRun<T> {
    /// Successful results, in no particular order.
    pub results: Vec<T>,
    /// Number of failed operations.
    pub failures: usize,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl<T> ConcurrentRun<T> {
    /// Total operations attempted.
    pub fn total(&self) -> usize {
        self.results.len() + self.failures
    }

    /// Returns true if every result maps to a distinct key.
    pub fn all_distinct_by<K: Hash + Eq>(&self, key: impl Fn(&T) -> K) -> bool {
        let mut seen = HashSet::with_capacity(self.results.len());
        self.results.iter().all(|r| seen.insert(key(r)))
    }
}

/// Configuration for concurrent runs.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyConfig {
    /// Number of threads.
    pub threads: usize,
    /// Operations per thread.
    pub per_thread: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            per_thread: 25,
        }
    }
}

/// Runs `op(thread, iteration)` on `config.threads` threads at once.
pub fn run_concurrently<T, F>(config: ConcurrencyConfig, op: F) -> ConcurrentRun<T>
where
    T: Send,
    F: Fn(usize, usize) -> StoreResult<T> + Sync,
{
    let start = Instant::now();
    let op = &op;
    let per_thread: Vec<(Vec<T>, usize)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..config.threads)
            .map(|t| {
                scope.spawn(move || {
                    let mut ok = Vec::with_capacity(config.per_thread);
                    let mut failed = 0usize;
                    for i in 0..config.per_thread {
                        match op(t, i) {
                            Ok(value) => ok.push(value),
                            Err(e) => {
                                tracing::warn!(thread = t, iteration = i, error = %e, "concurrent operation failed");
                                failed += 1;
                            }
                        }
                    }
                    (ok, failed)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("Worker thread panicked"))
            .collect()
    });

    let mut results = Vec::new();
    let mut failures = 0;
    for (ok, failed) in per_thread {
        results.extend(ok);
        failures += failed;
    }
    ConcurrentRun {
        results,
        failures,
        duration: start.elapsed(),
    }
}

/// Creates zones in one area from many threads.
pub fn concurrent_zone_creates(
    dm: &DeviceManagement,
    area_token: &str,
    config: ConcurrencyConfig,
) -> ConcurrentRun<Zone> {
    run_concurrently(config, |t, i| {
        dm.zones()
            .create(&requests::zone(area_token, &format!("zone-{t}-{i}")))
    })
}
