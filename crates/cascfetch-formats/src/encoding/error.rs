//! Error types for encoding file operations

use thiserror::Error;

/// Errors that can occur when loading an encoding table
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum EncodingError {
    #[error("Invalid magic: expected 'EN', got {0:?}")]
    InvalidMagic([u8; 2]),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid flags: byte at 0x11 must be 0, got {0}")]
    InvalidFlags(u8),

    #[error("Unsupported {field} hash size: expected 16, got {value}")]
    InvalidHashSize { field: &'static str, value: u8 },

    #[error("Invalid {field} page size: 0 KB")]
    InvalidPageSize { field: &'static str },

    #[error("Invalid {field} page count: must be > 0")]
    InvalidPageCount { field: &'static str },

    #[error("Encoding table truncated in {section}: need {needed} bytes, have {available}")]
    Truncated {
        section: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("{section} page {page} checksum mismatch")]
    ChecksumMismatch { section: &'static str, page: usize },

    #[error("ckey page {page} does not start with its index key")]
    FirstKeyMismatch { page: usize },

    #[error("{section} page {page} has a truncated entry at offset {offset}")]
    TruncatedEntry {
        section: &'static str,
        page: usize,
        offset: usize,
    },

    #[error("Binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),

    #[error("BLTE decode error: {0}")]
    Blte(#[from] crate::blte::BlteError),
}
