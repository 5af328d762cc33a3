//! Cache keys
//!
//! A key is a relative, `/`-separated path below the cache root. The
//! constructors for the well-known layouts keep every caller writing to
//! the same places.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{CacheError, CacheResult};

/// Validated relative cache path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Validate a raw key
    pub fn new(key: impl Into<String>) -> CacheResult<Self> {
        let key = key.into();
        let valid = !key.is_empty()
            && !key.starts_with('/')
            && !key.contains('\\')
            && !key.contains(':')
            && key
                .split('/')
                .all(|part| !part.is_empty() && part != "." && part != "..");
        if valid {
            Ok(Self(key))
        } else {
            Err(CacheError::InvalidKey(key))
        }
    }

    /// Build or CDN config blob: `config/<hash>`
    pub fn config(hash: &str) -> CacheResult<Self> {
        Self::new(format!("config/{hash}"))
    }

    /// CDN archive index: `indexes/<hash>.index`
    pub fn archive_index(hash: &str) -> CacheResult<Self> {
        Self::new(format!("indexes/{hash}.index"))
    }

    /// Fully downloaded CDN archive: `data/<hash>`
    pub fn archive(hash: &str) -> CacheResult<Self> {
        Self::new(format!("data/{hash}"))
    }

    /// Key table fetched during bootstrap: `keys/<hex content key>`
    pub fn key_table(content_key_hex: &str) -> CacheResult<Self> {
        Self::new(format!("keys/{content_key_hex}"))
    }

    /// Key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of this key below `root`
    pub fn to_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for CacheKey {
    type Error = CacheError;

    fn try_from(key: &str) -> CacheResult<Self> {
        Self::new(key)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_relative_paths() {
        for key in ["a", "config/abcd", "indexes/00ff.index", "keys/x/y"] {
            assert_eq!(CacheKey::new(key).expect(key).as_str(), key);
        }
    }

    #[test]
    fn test_rejects_escaping_keys() {
        for key in ["", "/etc/passwd", "../up", "a/../../b", "a\\b", "a//b", "./a", "a/", "C:x"] {
            assert!(
                matches!(CacheKey::new(key), Err(CacheError::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_layout_constructors() {
        assert_eq!(
            CacheKey::archive_index("abcd").expect("valid").to_string(),
            "indexes/abcd.index"
        );
        assert_eq!(CacheKey::archive("abcd").expect("valid").as_str(), "data/abcd");
        assert_eq!(CacheKey::config("ff").expect("valid").as_str(), "config/ff");
        assert_eq!(CacheKey::key_table("01").expect("valid").as_str(), "keys/01");
        assert!(CacheKey::archive("../x").is_err());
    }

    #[test]
    fn test_to_path() {
        let key = CacheKey::new("indexes/ab.index").expect("valid");
        assert_eq!(
            key.to_path(Path::new("/cache")),
            Path::new("/cache").join("indexes").join("ab.index")
        );
    }
}
