//! On-disk cache for CDN configs, archive indices, archives and key tables
//!
//! Entries are addressed by [`CacheKey`], a validated relative path. The
//! cache offers exactly four operations on top of that: existence check,
//! read, write and delete. Writes are atomic with respect to readers and
//! to other writers of the same key.
//!
//! ```no_run
//! # async fn demo() -> cascfetch_cache::CacheResult<()> {
//! use cascfetch_cache::{CacheKey, DiskCache};
//!
//! let cache = DiskCache::open("./cache").await?;
//! let key = CacheKey::archive_index("0017a402f556fbece46c38dc431a2c9b")?;
//! if !cache.exists(&key).await {
//!     cache.write(&key, b"...").await?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod disk_cache;
pub mod error;
pub mod key;

pub use disk_cache::DiskCache;
pub use error::{CacheError, CacheResult};
pub use key::CacheKey;
