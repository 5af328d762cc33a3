//! Error types for cache operations

use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Key is empty, absolute, uses `\` or escapes the cache root
    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),

    /// Key not present in the cache
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// IO error during cache operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
