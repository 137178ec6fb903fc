//! Hit/miss accounting for a [`TileFetcher`](super::TileFetcher).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated lock-free from concurrent fetches.
#[derive(Debug, Default)]
pub struct FetchStats {
    hits: AtomicU64,
    misses: AtomicU64,
    persist_failures: AtomicU64,
    bytes_fetched: AtomicU64,
}

impl FetchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self, bytes: usize) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.bytes_fetched.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            bytes_fetched: self.bytes_fetched.load(Ordering::Relaxed),
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.persist_failures.store(0, Ordering::Relaxed);
        self.bytes_fetched.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`FetchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStatsSnapshot {
    /// Tiles served from the cache
    pub hits: u64,
    /// Tiles downloaded from the provider
    pub misses: u64,
    /// Downloads that could not be written back to the cache
    pub persist_failures: u64,
    /// Bytes downloaded from the provider
    pub bytes_fetched: u64,
}

impl FetchStatsSnapshot {
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of tiles served from the cache, 0.0 when nothing was fetched.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for FetchStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tiles: {} cached, {} downloaded ({:.1}% hit rate, {} bytes)",
            self.total(),
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.bytes_fetched
        )?;
        if self.persist_failures > 0 {
            write!(f, ", {} not cached", self.persist_failures)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let stats = FetchStats::new();
        stats.record_hit();
        stats.record_miss(100);
        stats.record_miss(50);
        stats.record_persist_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.misses, 2);
        assert_eq!(snap.bytes_fetched, 150);
        assert_eq!(snap.persist_failures, 1);
        assert_eq!(snap.total(), 3);

        stats.reset();
        assert_eq!(stats.snapshot(), FetchStatsSnapshot::default());
    }

    #[test]
    fn test_hit_rate() {
        assert_eq!(FetchStatsSnapshot::default().hit_rate(), 0.0);

        let snap = FetchStatsSnapshot {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((snap.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_display_mentions_persist_failures_only_when_present() {
        let clean = FetchStatsSnapshot {
            hits: 1,
            misses: 1,
            persist_failures: 0,
            bytes_fetched: 10,
        };
        assert!(!clean.to_string().contains("not cached"));

        let dirty = FetchStatsSnapshot {
            persist_failures: 2,
            ..clean
        };
        assert!(dirty.to_string().ends_with("2 not cached"));
    }
}
