//! Disk-backed cache
//!
//! Entries are plain files below a root directory. Writes land in a
//! uniquely named temporary file next to the target and are renamed into
//! place, so concurrent writers of one key never expose a partial file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::error::{CacheError, CacheResult};
use crate::key::CacheKey;

/// Persistent cache rooted at a directory
#[derive(Debug)]
pub struct DiskCache {
    root: PathBuf,
    counter: AtomicU64,
}

impl DiskCache {
    /// Open a cache, creating the root directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> CacheResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "Opened disk cache");
        Ok(Self {
            root,
            counter: AtomicU64::new(0),
        })
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a key, whether or not it exists
    pub fn full_path(&self, key: &CacheKey) -> PathBuf {
        key.to_path(&self.root)
    }

    /// Whether an entry exists
    pub async fn exists(&self, key: &CacheKey) -> bool {
        let exists = fs::try_exists(self.full_path(key)).await.unwrap_or(false);
        trace!(%key, hit = exists, "Cache lookup");
        exists
    }

    /// Read a whole entry
    pub async fn read(&self, key: &CacheKey) -> CacheResult<Bytes> {
        match fs::read(self.full_path(key)).await {
            Ok(data) => {
                debug!(%key, size = data.len(), "Cache hit");
                Ok(Bytes::from(data))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(%key, "Cache miss");
                Err(CacheError::KeyNotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read an entry, treating a missing file as `None`
    pub async fn get(&self, key: &CacheKey) -> CacheResult<Option<Bytes>> {
        match self.read(key).await {
            Ok(data) => Ok(Some(data)),
            Err(CacheError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write an entry through a temporary file and rename
    pub async fn write(&self, key: &CacheKey, data: &[u8]) -> CacheResult<()> {
        let path = self.full_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(format!(".tmp-{}-{n}", std::process::id()));
        let temp_path = path.with_file_name(temp_name);

        let result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &path).await
        }
        .await;

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_file(&temp_path).await
                && cleanup.kind() != ErrorKind::NotFound
            {
                warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove temporary cache file");
            }
            return Err(e.into());
        }

        debug!(%key, size = data.len(), "Cached entry");
        Ok(())
    }

    /// Remove an entry; returns whether it existed
    pub async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        match fs::remove_file(self.full_path(key)).await {
            Ok(()) => {
                debug!(%key, "Deleted cache entry");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn key(s: &str) -> CacheKey {
        CacheKey::new(s).expect("valid key")
    }

    #[tokio::test]
    async fn test_basic_operations() {
        let temp_dir = TempDir::new().expect("tempdir");
        let cache = DiskCache::open(temp_dir.path().join("cache"))
            .await
            .expect("open");
        let k = key("indexes/abcd.index");

        assert!(!cache.exists(&k).await);
        assert!(cache.get(&k).await.expect("get").is_none());
        assert!(matches!(cache.read(&k).await, Err(CacheError::KeyNotFound(_))));

        cache.write(&k, b"index bytes").await.expect("write");
        assert!(cache.exists(&k).await);
        assert_eq!(cache.read(&k).await.expect("read"), Bytes::from_static(b"index bytes"));
        assert!(cache.full_path(&k).starts_with(temp_dir.path()));

        assert!(cache.delete(&k).await.expect("delete"));
        assert!(!cache.delete(&k).await.expect("delete again"));
        assert!(!cache.exists(&k).await);
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temporaries() {
        let temp_dir = TempDir::new().expect("tempdir");
        let cache = DiskCache::open(temp_dir.path()).await.expect("open");
        let k = key("data/archive");

        cache.write(&k, b"first").await.expect("write");
        cache.write(&k, b"second").await.expect("overwrite");
        assert_eq!(cache.read(&k).await.expect("read"), Bytes::from_static(b"second"));

        let names: Vec<_> = std::fs::read_dir(temp_dir.path().join("data"))
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("archive")]);
    }

    #[tokio::test]
    async fn test_concurrent_writers_never_tear() {
        let temp_dir = TempDir::new().expect("tempdir");
        let cache = Arc::new(DiskCache::open(temp_dir.path()).await.expect("open"));
        let k = key("keys/shared");

        let writers: Vec<_> = (0u8..8)
            .map(|n| {
                let cache = Arc::clone(&cache);
                let k = k.clone();
                tokio::spawn(async move { cache.write(&k, &vec![n; 64 * 1024]).await })
            })
            .collect();
        for writer in writers {
            writer.await.expect("join").expect("write");
        }

        let data = cache.read(&k).await.expect("read");
        assert_eq!(data.len(), 64 * 1024);
        assert!(data.iter().all(|&b| b == data[0]));
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let temp_dir = TempDir::new().expect("tempdir");
        let k = key("config/ff00");
        {
            let cache = DiskCache::open(temp_dir.path()).await.expect("open");
            cache.write(&k, b"persistent").await.expect("write");
        }
        let cache = DiskCache::open(temp_dir.path()).await.expect("reopen");
        assert_eq!(cache.get(&k).await.expect("get"), Some(Bytes::from_static(b"persistent")));
    }
}
