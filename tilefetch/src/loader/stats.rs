//! Loader statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by fetch jobs.
#[derive(Debug, Default)]
pub struct LoaderStats {
    cache_hits: AtomicU64,
    downloads: AtomicU64,
    stale_fallbacks: AtomicU64,
    failures: AtomicU64,
    no_tile: AtomicU64,
    cache_write_failures: AtomicU64,
    skipped: AtomicU64,
    bytes_downloaded: AtomicU64,
}

impl LoaderStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tile served from a fresh cache file.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a tile loaded from the network.
    pub fn record_download(&self, bytes: u64) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a tile served from a stale cache file after a failed fetch.
    pub fn record_stale_fallback(&self) {
        self.stale_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a tile left in the failed state.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a "no tile" answer from the provider.
    pub fn record_no_tile(&self) {
        self.no_tile.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a download that could not be written to the cache.
    pub fn record_cache_write_failure(&self) {
        self.cache_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job skipped by the loading guard.
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> LoaderStatsSnapshot {
        LoaderStatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            downloads: self.downloads.load(Ordering::Relaxed),
            stale_fallbacks: self.stale_fallbacks.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            no_tile: self.no_tile.load(Ordering::Relaxed),
            cache_write_failures: self.cache_write_failures.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }
}

/// Counters copied out of [`LoaderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStatsSnapshot {
    pub cache_hits: u64,
    pub downloads: u64,
    pub stale_fallbacks: u64,
    /// Includes `no_tile`
    pub failures: u64,
    pub no_tile: u64,
    pub cache_write_failures: u64,
    pub skipped: u64,
    pub bytes_downloaded: u64,
}

impl LoaderStatsSnapshot {
    /// Jobs that ran to a terminal state.
    pub fn completed(&self) -> u64 {
        self.cache_hits + self.downloads + self.stale_fallbacks + self.failures
    }

    /// Fraction of completed jobs answered from a fresh cache file (0.0 to 1.0).
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.completed();
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for LoaderStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cache hits, {} downloads ({} bytes), {} stale, {} failed ({} no tile), {} skipped, {} cache write failures",
            self.cache_hits,
            self.downloads,
            self.bytes_downloaded,
            self.stale_fallbacks,
            self.failures,
            self.no_tile,
            self.skipped,
            self.cache_write_failures
        )
    }
}
