//! BLTE error types

use cascfetch_crypto::CryptoError;
use thiserror::Error;

/// BLTE-specific error type
#[derive(Debug, Error)]
pub enum BlteError {
    /// Invalid BLTE magic bytes
    #[error("invalid BLTE magic: expected [42 4C 54 45], got {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Input ended before a structure was complete
    #[error("truncated BLTE data: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// Declared header size disagrees with the chunk table
    #[error("invalid header size: declared {declared}, chunk table needs {expected}")]
    InvalidHeaderSize {
        /// Value from the header
        declared: u32,
        /// Size implied by flags and chunk count
        expected: usize,
    },

    /// Unknown chunk table flags
    #[error("invalid header flags: 0x{0:02X}")]
    InvalidHeaderFlags(u8),

    /// Invalid chunk count
    #[error("invalid chunk count: {0}")]
    InvalidChunkCount(u32),

    /// Chunk table sizes do not cover the payload exactly
    #[error("chunk table declares {declared} bytes but {available} bytes follow the header")]
    ChunkSizeMismatch {
        /// Sum of compressed sizes
        declared: u64,
        /// Bytes after the header
        available: usize,
    },

    /// Empty chunk encountered
    #[error("chunk {0} is empty")]
    EmptyChunk(usize),

    /// Unknown chunk mode
    #[error("unknown chunk mode: 0x{0:02X}")]
    UnknownChunkMode(u8),

    /// Known but unsupported chunk mode
    #[error("unsupported chunk mode: 0x{0:02X}")]
    UnsupportedChunkMode(u8),

    /// Checksum mismatch
    #[error("chunk {chunk} checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Chunk index
        chunk: usize,
        /// Expected checksum
        expected: String,
        /// Actual checksum
        actual: String,
    },

    /// Decoded chunk length differs from the declared length
    #[error("chunk {chunk} decoded to {actual} bytes, expected {expected}")]
    DecodedSizeMismatch {
        /// Chunk index
        chunk: usize,
        /// Declared decompressed size
        expected: usize,
        /// Actual decoded size
        actual: usize,
    },

    /// Output would exceed the decompression limit
    #[error("decoded size {0} exceeds limit")]
    SizeLimitExceeded(u64),

    /// zlib or LZ4 failure
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// Compression failure while building
    #[error("compression failed: {0}")]
    Compression(String),

    /// Malformed encrypted chunk header
    #[error("invalid encrypted chunk: {0}")]
    InvalidEncryptedChunk(String),

    /// Unknown cipher byte
    #[error("unknown encryption type: 0x{0:02X}")]
    UnknownEncryptionType(u8),

    /// Encryption key not found
    #[error("encryption key not found: {0:016X}")]
    KeyNotFound(u64),

    /// Encrypted chunks nested deeper than allowed
    #[error("encrypted chunks nested more than {0} levels")]
    NestingTooDeep(usize),

    /// Cipher setup failure
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for BLTE operations
pub type BlteResult<T> = Result<T, BlteError>;
