//! Error types for record table parsing

use thiserror::Error;

/// Errors from the WDC3 reader
#[derive(Debug, Error)]
pub enum Db2Error {
    /// File does not start with `WDC3`
    #[error("Invalid DB2 magic: {0:?}")]
    InvalidMagic([u8; 4]),

    /// A region extends past the end of the file
    #[error("DB2 file truncated in {section}: need {needed} bytes, have {available}")]
    Truncated {
        /// Region being read
        section: &'static str,
        /// Bytes required
        needed: usize,
        /// Bytes left
        available: usize,
    },

    /// Layout feature this reader does not handle
    #[error("Unsupported DB2 layout: {0}")]
    Unsupported(String),

    /// Field storage type outside 0..=5
    #[error("Unknown field storage type {0}")]
    UnknownStorage(u32),

    /// Failure reading a file from disk
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary layout error
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Type alias for record table results
pub type Result<T> = std::result::Result<T, Db2Error>;
