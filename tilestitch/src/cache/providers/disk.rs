//! On-disk cache provider.
//!
//! Tiles persist across runs, so a re-run over an already fetched area
//! costs no network traffic. There is no eviction or staleness policy:
//! the directory grows until the user clears it.
//!
//! # File Layout
//!
//! Each `:`-separated key segment becomes one directory level, so
//! `tile:osm:18:44962:104672` is stored at
//! ```text
//! {cache_dir}/tile/osm/18/44962/104672.bin
//! ```
//! The layout is stable across builds and easy to inspect by hand.
//!
//! Bytes outside `[A-Za-z0-9_-]` are written as `%XX` (uppercase hex) and
//! an empty segment as a lone `%`. The mapping is reversible, so distinct
//! ids such as `a.b` and `a_b` never share a file, and no
//! segment can be `.` or `..`.
//!
//! # Atomic Writes
//!
//! Values are written to a uniquely named temporary sibling and renamed
//! into place, so a concurrent reader sees either no file or the whole file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::cache::traits::{BoxFuture, Cache, CacheError};

const ENTRY_EXTENSION: &str = "bin";
const TEMP_EXTENSION: &str = "tmp";

/// On-disk cache provider.
pub struct DiskCacheProvider {
    directory: PathBuf,

    /// Number of entries, scanned at open and maintained on set/delete.
    entry_count: AtomicU64,

    /// Distinguishes temporary files of concurrent writers.
    temp_counter: AtomicU64,
}

impl DiskCacheProvider {
    /// Opens (creating if needed) a disk cache rooted at `directory`.
    ///
    /// Existing entries are counted in a blocking task, and leftover
    /// temporary files from an interrupted run are removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub async fn open(directory: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await?;

        let scan_dir = directory.clone();
        let (entries, stale) = tokio::task::spawn_blocking(move || scan_directory(&scan_dir))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))?;

        info!(
            dir = %directory.display(),
            entries,
            stale_temp_files = stale,
            "Disk cache opened"
        );

        Ok(Self {
            directory,
            entry_count: AtomicU64::new(entries),
            temp_counter: AtomicU64::new(0),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Maps a cache key onto a file path below the cache directory.
    ///
    /// Segments are escaped with [`escape_segment`], so a key can never
    /// escape the directory and distinct keys get distinct paths.
    fn key_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey(key.to_string()));
        }

        let segments: Vec<String> = key.split(':').map(escape_segment).collect();
        let mut path = self.directory.clone();
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| CacheError::InvalidKey(key.to_string()))?;
        for segment in parents {
            path.push(segment);
        }
        path.push(format!("{}.{}", last, ENTRY_EXTENSION));
        Ok(path)
    }

    fn temp_path(&self, path: &Path) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("{}.{}.{}", std::process::id(), n, TEMP_EXTENSION))
    }
}

/// Percent-escapes every byte outside `[A-Za-z0-9_-]`.
fn escape_segment(segment: &str) -> String {
    if segment.is_empty() {
        return "%".to_string();
    }
    let mut escaped = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{:02X}", byte));
        }
    }
    escaped
}

/// Counts entries below `dir` and deletes stale temporary files.
fn scan_directory(dir: &Path) -> (u64, u64) {
    let mut entries = 0;
    let mut stale = 0;
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let Ok(read_dir) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in read_dir.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == TEMP_EXTENSION) {
                if std::fs::remove_file(&path).is_ok() {
                    stale += 1;
                }
            } else if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                entries += 1;
            }
        }
    }

    (entries, stale)
}

impl Cache for DiskCacheProvider {
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), CacheError>> {
        let path = self.key_path(key);
        Box::pin(async move {
            let path = path?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let existed = tokio::fs::try_exists(&path).await.unwrap_or(false);
            let temp_path = self.temp_path(&path);
            if let Err(e) = tokio::fs::write(&temp_path, &value).await {
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(CacheError::Io(e));
            }
            if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(CacheError::Io(e));
            }

            if !existed {
                self.entry_count.fetch_add(1, Ordering::Relaxed);
            }
            debug!(path = %path.display(), bytes = value.len(), "Cache entry written");
            Ok(())
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, CacheError>> {
        let path = self.key_path(key);
        Box::pin(async move {
            match tokio::fs::read(path?).await {
                Ok(data) => Ok(Some(data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(CacheError::Io(e)),
            }
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let path = self.key_path(key);
        Box::pin(async move {
            match tokio::fs::remove_file(path?).await {
                Ok(()) => {
                    self.entry_count.fetch_sub(1, Ordering::Relaxed);
                    Ok(true)
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(CacheError::Io(e)),
            }
        })
    }

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let path = self.key_path(key);
        Box::pin(async move { Ok(tokio::fs::try_exists(path?).await?) })
    }

    fn entry_count(&self) -> u64 {
        self.entry_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_provider() -> (TempDir, DiskCacheProvider) {
        let temp_dir = TempDir::new().unwrap();
        let provider = DiskCacheProvider::open(temp_dir.path().join("cache"))
            .await
            .unwrap();
        (temp_dir, provider)
    }

    fn temp_files(dir: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            for entry in std::fs::read_dir(current).unwrap().filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if path.extension().is_some_and(|ext| ext == TEMP_EXTENSION) {
                    found.push(path);
                }
            }
        }
        found
    }

    #[tokio::test]
    async fn test_disk_provider_set_and_get() {
        let (_temp_dir, provider) = create_test_provider().await;

        provider.set("tile:osm:18:1:2", vec![1, 2, 3]).await.unwrap();

        assert_eq!(
            provider.get("tile:osm:18:1:2").await.unwrap(),
            Some(vec![1, 2, 3])
        );
        assert!(provider.get("tile:osm:18:1:3").await.unwrap().is_none());
        assert_eq!(provider.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_disk_provider_layout() {
        let (_temp_dir, provider) = create_test_provider().await;

        provider
            .set("tile:osm:18:44962:104672", vec![9])
            .await
            .unwrap();

        let expected = provider
            .directory()
            .join("tile/osm/18/44962/104672.bin");
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn test_disk_provider_delete_and_contains() {
        let (_temp_dir, provider) = create_test_provider().await;

        provider.set("k", vec![1]).await.unwrap();
        assert!(provider.contains("k").await.unwrap());

        assert!(provider.delete("k").await.unwrap());
        assert!(!provider.contains("k").await.unwrap());
        assert!(!provider.delete("k").await.unwrap());
        assert_eq!(provider.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_disk_provider_replace_existing() {
        let (_temp_dir, provider) = create_test_provider().await;

        provider.set("k", vec![1, 2, 3]).await.unwrap();
        provider.set("k", vec![4, 5, 6, 7]).await.unwrap();

        assert_eq!(provider.get("k").await.unwrap(), Some(vec![4, 5, 6, 7]));
        assert_eq!(provider.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_disk_provider_atomic_write_leaves_no_temp_files() {
        let (_temp_dir, provider) = create_test_provider().await;

        provider.set("tile:a:1:0:0", vec![1, 2, 3]).await.unwrap();
        provider.set("tile:a:1:0:1", vec![4, 5, 6]).await.unwrap();

        assert!(temp_files(provider.directory()).is_empty());
    }

    #[tokio::test]
    async fn test_disk_provider_persists_across_open() {
        let temp_dir = TempDir::new().unwrap();
        {
            let provider = DiskCacheProvider::open(temp_dir.path()).await.unwrap();
            provider.set("tile:x:3:1:1", vec![5; 10]).await.unwrap();
        }

        let stale = temp_dir.path().join("tile/x/3/1/0.1.2.tmp");
        std::fs::write(&stale, b"partial").unwrap();

        let reopened = DiskCacheProvider::open(temp_dir.path()).await.unwrap();
        assert_eq!(reopened.entry_count(), 1);
        assert_eq!(reopened.get("tile:x:3:1:1").await.unwrap(), Some(vec![5; 10]));
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn test_disk_provider_keys_cannot_escape() {
        let (_temp_dir, provider) = create_test_provider().await;

        let path = provider.key_path("../..:etc/passwd").unwrap();
        assert!(path.starts_with(provider.directory()));
        assert_eq!(
            path,
            provider.directory().join("%2E%2E%2F%2E%2E/etc%2Fpasswd.bin")
        );
        assert!(provider.key_path("").is_err());
    }

    #[test]
    fn test_escape_segment() {
        assert_eq!(escape_segment("osm_v2-hd"), "osm_v2-hd");
        assert_eq!(escape_segment("a.b"), "a%2Eb");
        assert_eq!(escape_segment("100%"), "100%25");
        assert_eq!(escape_segment("é"), "%C3%A9");
        assert_eq!(escape_segment(""), "%");
    }

    #[tokio::test]
    async fn test_disk_provider_similar_ids_do_not_collide() {
        let (_temp_dir, provider) = create_test_provider().await;

        assert_ne!(
            provider.key_path("tile:a.b:3:1:1").unwrap(),
            provider.key_path("tile:a_b:3:1:1").unwrap()
        );
        assert_ne!(
            provider.key_path("tile::3:1:1").unwrap(),
            provider.key_path("tile:_:3:1:1").unwrap()
        );

        provider.set("tile:a.b:3:1:1", vec![1]).await.unwrap();
        assert!(provider.get("tile:a_b:3:1:1").await.unwrap().is_none());
        provider.set("tile:a_b:3:1:1", vec![2]).await.unwrap();
        assert_eq!(provider.get("tile:a.b:3:1:1").await.unwrap(), Some(vec![1]));
        assert_eq!(provider.entry_count(), 2);
    }
}
