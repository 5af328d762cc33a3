//! Error types for root file parsing

use thiserror::Error;

/// Errors that can occur when parsing a root file
#[derive(Error, Debug)]
pub enum RootError {
    /// Extended header declares a version this reader cannot parse
    #[error("Unsupported root version: {0}")]
    UnsupportedVersion(u32),

    /// Extended header size is smaller than the fields it must hold
    #[error("Invalid root header size: {0}")]
    InvalidHeaderSize(u32),

    /// Root data ended inside a block
    #[error("Truncated root block at offset {offset}: need {needed} bytes, have {available}")]
    TruncatedBlock {
        /// Offset of the block header
        offset: usize,
        /// Bytes the block requires
        needed: usize,
        /// Bytes left in the file
        available: usize,
    },

    /// `FileDataID` deltas overflowed the id space
    #[error("Invalid FileDataID delta sequence in block at offset {0}")]
    InvalidDelta(usize),

    /// BLTE decoding of the root blob failed
    #[error("BLTE decode error: {0}")]
    Blte(#[from] crate::blte::BlteError),
}

/// Type alias for root file operation results
pub type Result<T> = std::result::Result<T, RootError>;
