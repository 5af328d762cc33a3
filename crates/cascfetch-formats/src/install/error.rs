//! Error types for install manifest operations

use thiserror::Error;

/// Errors that can occur when parsing an install manifest
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum InstallError {
    #[error("Invalid magic: expected 'IN', got {0:?}")]
    InvalidMagic([u8; 2]),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid content key length: expected 16, got {0}")]
    InvalidCKeyLength(u8),

    #[error("Install manifest truncated in {section}: need {needed} bytes, have {available}")]
    Truncated {
        section: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Unterminated string in {section} at offset {offset}")]
    UnterminatedString { section: &'static str, offset: usize },

    #[error("BLTE decode error: {0}")]
    Blte(#[from] crate::blte::BlteError),
}

/// Type alias for install manifest results
pub type Result<T> = std::result::Result<T, InstallError>;
