//! In-memory cache provider using moka.
//!
//! Backs ephemeral runs where nothing should touch disk, and the fetch and
//! compose tests. Entries are weighted by their byte length so the cache
//! stays within `max_size_bytes`; moka evicts least-recently-used tiles
//! when it fills.

use moka::future::Cache as MokaCache;

use crate::cache::traits::{BoxFuture, Cache, CacheError};

/// Default capacity for ephemeral runs (512 MiB).
pub const DEFAULT_MEMORY_CACHE_BYTES: u64 = 512 * 1024 * 1024;

/// In-memory cache provider using moka.
pub struct MemoryCacheProvider {
    cache: MokaCache<String, Vec<u8>>,
    max_size_bytes: u64,
}

impl MemoryCacheProvider {
    /// Create a new memory cache provider holding at most `max_size_bytes`.
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            .weigher(|_key: &String, value: &Vec<u8>| -> u32 {
                // moka uses u32 for weights, cap at u32::MAX for very large entries
                value.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            cache,
            max_size_bytes,
        }
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Total weighted size of all entries.
    ///
    /// moka is eventually consistent; call [`sync`](Self::sync) first when
    /// an exact figure matters.
    pub fn size_bytes(&self) -> u64 {
        self.cache.weighted_size()
    }

    /// Runs pending maintenance (eviction, counters).
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Default for MemoryCacheProvider {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CACHE_BYTES)
    }
}

impl Cache for MemoryCacheProvider {
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), CacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.cache.insert(key, value).await;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, CacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.get(&key).await) })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.remove(&key).await.is_some()) })
    }

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.contains_key(&key)) })
    }

    fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
