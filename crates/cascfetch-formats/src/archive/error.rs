//! Error types for archive index parsing

use thiserror::Error;

/// Archive index result type
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that can occur when parsing a CDN archive index
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Index is smaller than its footer
    #[error("Archive index too small: {0} bytes")]
    TooSmall(usize),

    /// Footer checksum does not match the footer fields
    #[error("Archive index footer checksum mismatch: expected {expected:02x?}, got {actual:02x?}")]
    FooterChecksum {
        /// Checksum computed from the footer fields
        expected: [u8; 8],
        /// Checksum stored in the footer
        actual: [u8; 8],
    },

    /// Unsupported index version
    #[error("Unsupported index version: {0}")]
    UnsupportedVersion(u8),

    /// A footer field holds a value this reader cannot interpret
    #[error("Invalid archive index footer: {0}")]
    InvalidFooter(String),

    /// Page region is inconsistent with the declared entry count
    #[error("Archive index declares {declared} entries but holds {found}")]
    EntryCountMismatch {
        /// Count from the footer
        declared: u32,
        /// Entries present in the pages
        found: usize,
    },

    /// Entries are not sorted by key
    #[error("Entries not sorted by encoding key")]
    UnsortedEntries,
}
