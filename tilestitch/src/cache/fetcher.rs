//! Cache-first tile fetching.
//!
//! [`TileFetcher`] wraps an [`AsyncProvider`] with a [`Cache`]:
//! - Key translation: `(provider, zoom, x, y)` → `"tile:{provider}:{zoom}:{x}:{y}"`
//! - Concurrency limiting: a semaphore caps in-flight provider requests
//! - Accounting: hits, misses, persist failures and bytes downloaded
//!
//! The cache is best-effort. A failed read counts as a miss and a failed
//! write is logged; neither fails the fetch.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, trace, warn};

use crate::cache::stats::{FetchStats, FetchStatsSnapshot};
use crate::cache::traits::Cache;
use crate::coord::TileCoord;
use crate::provider::{AsyncProvider, ProviderError};

/// Default cap on concurrent provider requests.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 16;

/// A tile could not be obtained from the provider.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Failed to fetch tile {zoom}/{x}/{y}: {cause}")]
pub struct TileFetchError {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
    #[source]
    pub cause: ProviderError,
}

/// Builds the cache key for a tile.
///
/// Keys follow `tile:{provider}:{zoom}:{x}:{y}`, for example
/// `tile:arcgis:18:44962:104672`.
pub fn tile_key(provider_id: &str, x: u32, y: u32, zoom: u8) -> String {
    format!("tile:{}:{}:{}:{}", provider_id, zoom, x, y)
}

/// Fetches tiles through a persistent cache.
pub struct TileFetcher<P: AsyncProvider> {
    provider: Arc<P>,
    cache: Arc<dyn Cache>,
    permits: Arc<Semaphore>,
    stats: FetchStats,
}

impl<P: AsyncProvider> TileFetcher<P> {
    /// Create a fetcher with the default concurrency limit.
    pub fn new(provider: Arc<P>, cache: Arc<dyn Cache>) -> Self {
        Self::with_concurrency_limit(provider, cache, DEFAULT_MAX_CONCURRENT_FETCHES)
    }

    /// Create a fetcher allowing at most `max_concurrent` provider requests.
    pub fn with_concurrency_limit(
        provider: Arc<P>,
        cache: Arc<dyn Cache>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            provider,
            cache,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            stats: FetchStats::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the encoded bytes of a tile, from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `TileFetchError` if the tile is not cached and the provider
    /// request fails. Failed requests are not retried.
    pub async fn fetch_tile(&self, x: u32, y: u32, zoom: u8) -> Result<Vec<u8>, TileFetchError> {
        let key = tile_key(self.provider.id(), x, y, zoom);

        match self.cache.get(&key).await {
            Ok(Some(data)) => {
                trace!(key = %key, "Tile cache hit");
                self.stats.record_hit();
                return Ok(data);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "Tile cache read failed, treating as miss");
            }
        }

        let data = {
            let _permit = self.permits.acquire().await.map_err(|_| TileFetchError {
                x,
                y,
                zoom,
                cause: ProviderError::HttpError("fetch limiter closed".to_string()),
            })?;
            self.provider
                .fetch_tile(x, y, zoom)
                .await
                .map_err(|cause| TileFetchError { x, y, zoom, cause })?
        };

        self.stats.record_miss(data.len());
        debug!(
            provider = self.provider.name(),
            x, y, zoom,
            bytes = data.len(),
            "Tile downloaded"
        );

        if let Err(e) = self.cache.set(&key, data.clone()).await {
            self.stats.record_persist_failure();
            warn!(key = %key, error = %e, "CachePersistError: failed to cache tile");
        }

        Ok(data)
    }

    /// Convenience wrapper taking a [`TileCoord`].
    pub async fn fetch(&self, tile: TileCoord) -> Result<Vec<u8>, TileFetchError> {
        self.fetch_tile(tile.x, tile.y, tile.zoom).await
    }

    /// Snapshot of the counters since creation or the last reset.
    pub fn stats(&self) -> FetchStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::cache::traits::{BoxFuture, CacheError};
    use crate::cache::MemoryCacheProvider;

    /// Provider returning a fixed payload and counting requests.
    pub(crate) struct CountingProvider {
        pub calls: AtomicUsize,
        pub fail_on: Option<(u32, u32)>,
    }

    impl CountingProvider {
        pub(crate) fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on: None,
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AsyncProvider for CountingProvider {
        async fn fetch_tile(&self, x: u32, y: u32, _zoom: u8) -> Result<Vec<u8>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some((x, y)) {
                return Err(ProviderError::HttpError("HTTP 503".to_string()));
            }
            Ok(vec![x as u8, y as u8])
        }

        fn name(&self) -> &str {
            "Counting"
        }

        fn id(&self) -> &str {
            "counting"
        }

        fn min_zoom(&self) -> u8 {
            0
        }

        fn max_zoom(&self) -> u8 {
            22
        }
    }

    /// Cache whose reads and writes always fail.
    struct BrokenCache;

    impl Cache for BrokenCache {
        fn set(&self, _key: &str, _value: Vec<u8>) -> BoxFuture<'_, Result<(), CacheError>> {
            Box::pin(async { Err(CacheError::Task("disk full".to_string())) })
        }

        fn get(&self, _key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, CacheError>> {
            Box::pin(async { Err(CacheError::Task("unreadable".to_string())) })
        }

        fn delete(&self, _key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
            Box::pin(async { Ok(false) })
        }

        fn contains(&self, _key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
            Box::pin(async { Ok(false) })
        }

        fn entry_count(&self) -> u64 {
            0
        }
    }

    fn fetcher(provider: Arc<CountingProvider>) -> TileFetcher<CountingProvider> {
        TileFetcher::new(provider, Arc::new(MemoryCacheProvider::new(1_000_000)))
    }

    #[test]
    fn test_tile_key_format() {
        assert_eq!(
            tile_key("arcgis", 44962, 104672, 18),
            "tile:arcgis:18:44962:104672"
        );
    }

    #[tokio::test]
    async fn test_same_tile_twice_hits_network_once() {
        let provider = Arc::new(CountingProvider::new());
        let fetcher = fetcher(Arc::clone(&provider));

        let first = fetcher.fetch_tile(3, 4, 10).await.unwrap();
        let second = fetcher.fetch_tile(3, 4, 10).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);

        let stats = fetcher.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.bytes_fetched, 2);
    }

    #[tokio::test]
    async fn test_provider_error_carries_coordinates() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            fail_on: Some((7, 8)),
        });
        let fetcher = fetcher(Arc::clone(&provider));

        let err = fetcher.fetch_tile(7, 8, 12).await.unwrap_err();
        assert_eq!(err.x, 7);
        assert_eq!(err.y, 8);
        assert_eq!(err.zoom, 12);
        assert_eq!(err.cause, ProviderError::HttpError("HTTP 503".to_string()));
        assert_eq!(err.to_string(), "Failed to fetch tile 12/7/8: HTTP error: HTTP 503");

        // Not cached, so the next attempt goes to the network again
        let _ = fetcher.fetch_tile(7, 8, 12).await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_broken_cache_does_not_fail_fetch() {
        let provider = Arc::new(CountingProvider::new());
        let fetcher = TileFetcher::new(Arc::clone(&provider), Arc::new(BrokenCache));

        assert_eq!(fetcher.fetch_tile(1, 2, 3).await.unwrap(), vec![1, 2]);
        assert_eq!(fetcher.fetch_tile(1, 2, 3).await.unwrap(), vec![1, 2]);

        let stats = fetcher.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.persist_failures, 2);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_reset_stats() {
        let provider = Arc::new(CountingProvider::new());
        let fetcher = fetcher(provider);

        fetcher.fetch_tile(0, 0, 1).await.unwrap();
        fetcher.reset_stats();
        fetcher.fetch_tile(0, 0, 1).await.unwrap();

        assert_eq!(
            fetcher.stats(),
            FetchStatsSnapshot {
                hits: 1,
                misses: 0,
                persist_failures: 0,
                bytes_fetched: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_cache() {
        use futures::future::join_all;

        let provider = Arc::new(CountingProvider::new());
        let fetcher = fetcher(Arc::clone(&provider));

        let first_pass = (0..8u32).map(|x| fetcher.fetch_tile(x, 0, 5));
        assert!(join_all(first_pass).await.iter().all(|r| r.is_ok()));

        let second_pass = (0..8u32).map(|x| fetcher.fetch_tile(x, 0, 5));
        assert!(join_all(second_pass).await.iter().all(|r| r.is_ok()));

        assert_eq!(provider.calls(), 8);
        assert_eq!(fetcher.stats().hits, 8);
    }
}
