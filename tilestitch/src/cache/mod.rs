//! Persistent tile cache and cache-first fetching.
//!
//! - [`Cache`]: string-keyed blob store trait
//! - [`DiskCacheProvider`] / [`MemoryCacheProvider`]: its implementations
//! - [`TileFetcher`]: provider access through the cache, with [`FetchStats`]

mod fetcher;
mod providers;
mod stats;
mod traits;

pub use fetcher::{tile_key, TileFetchError, TileFetcher, DEFAULT_MAX_CONCURRENT_FETCHES};
pub use providers::{DiskCacheProvider, MemoryCacheProvider, DEFAULT_MEMORY_CACHE_BYTES};
pub use stats::{FetchStats, FetchStatsSnapshot};
pub use traits::{BoxFuture, Cache, CacheError};

#[cfg(test)]
pub(crate) use fetcher::tests::CountingProvider;
