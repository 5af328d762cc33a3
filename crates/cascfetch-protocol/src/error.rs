//! Error types for protocol operations

use thiserror::Error;

/// Errors raised by version discovery and CDN transfers
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Socket-level failure
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// Failure inside the HTTP client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP status {0}")]
    HttpStatus(reqwest::StatusCode),

    /// 5xx status
    #[error("Server error: {0}")]
    ServerError(reqwest::StatusCode),

    /// Response could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// BPSV document could not be parsed
    #[error("BPSV error: {0}")]
    Bpsv(#[from] cascfetch_formats::bpsv::BpsvError),

    /// Cache read or write failed
    #[error("Cache error: {0}")]
    Cache(#[from] cascfetch_cache::CacheError),

    /// Every configured host failed
    #[error("All {count} hosts failed, last error: {last}")]
    AllHostsFailed {
        /// Number of hosts tried
        count: usize,
        /// Error returned by the last host
        last: Box<ProtocolError>,
    },

    /// Discovery produced no CDN hosts
    #[error("No hosts returned for program '{program}' region '{region}'")]
    NoHosts {
        /// Product code
        program: String,
        /// Region code
        region: String,
    },

    /// Server ignored a range request and sent less than the requested span
    #[error("Range {offset}+{length} not served, got {received} bytes")]
    RangeNotSupported {
        /// Requested offset
        offset: u64,
        /// Requested length
        length: u64,
        /// Bytes received
        received: usize,
    },

    /// Response exceeded the size limit
    #[error("Response too large: over {limit} bytes")]
    ResponseTooLarge {
        /// Limit in bytes
        limit: usize,
    },

    /// Malformed host or URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Response was not UTF-8 text
    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl ProtocolError {
    /// Whether the same request may succeed when repeated
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Network(_) | Self::ServerError(_) | Self::Timeout => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatus(status) => matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

/// Result alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
