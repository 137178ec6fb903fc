//! Cache provider implementations.
//!
//! - [`DiskCacheProvider`]: one file per key, survives across runs
//! - [`MemoryCacheProvider`]: moka-backed, for tests and `--no-cache` runs

mod disk;
mod memory;

pub use disk::DiskCacheProvider;
pub use memory::{MemoryCacheProvider, DEFAULT_MEMORY_CACHE_BYTES};
