//! Read-only access to a local CASC installation
//!
//! A World of Warcraft install keeps its content under `Data/data/`:
//!
//! - `.idx` journals, sixteen buckets, map the first 9 bytes of an
//!   encoding key to an archive number, offset and size
//! - `data.NNN` archives hold BLTE blobs, each behind a 30-byte local
//!   header
//!
//! [`LocalStorage`] loads the newest journal of every bucket and reads
//! raw BLTE bytes on request. Decoding is left to the caller.
//!
//! ```rust,no_run
//! use cascfetch_client_storage::LocalStorage;
//! use cascfetch_crypto::EncodingKey;
//!
//! # async fn example(ekey: EncodingKey) -> cascfetch_client_storage::Result<()> {
//! let storage = LocalStorage::open("/games/World of Warcraft/_retail_").await?;
//! if let Some(entry) = storage.locate(&ekey) {
//!     let blte = storage.read(&entry, &ekey)?;
//!     println!("{} BLTE bytes", blte.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]

use thiserror::Error;

// Data archives
pub mod archive;

// Index journals
pub mod index;

// 30-byte entry header in data archives
pub mod local_header;

// Installation entry point
pub mod storage;

#[cfg(any(test, feature = "builders"))]
pub mod writer;

pub use archive::ArchiveReader;
pub use index::{ArchiveLocation, IndexEntry, IndexManager};
pub use local_header::{LOCAL_HEADER_SIZE, LocalHeader};
pub use storage::LocalStorage;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Index file error.
    #[error("Index error: {0}")]
    Index(String),

    /// Archive file error.
    #[error("Archive error: {0}")]
    Archive(String),

    /// The local header in front of a blob names a different key.
    #[error("Local header key {found} does not match {expected}")]
    HeaderMismatch {
        /// Hex of the first 9 bytes of the requested key
        expected: String,
        /// Hex of the first 9 bytes found in the header
        found: String,
    },

    /// The installation has no `Data/data` directory.
    #[error("Not a CASC installation: {0}")]
    Installation(String),
}
