//! Error types for resolver construction, extraction and key bootstrap

use std::path::PathBuf;

use cascfetch_crypto::ContentKey;
use thiserror::Error;

/// Failures that prevent a resolver from being built
///
/// Every variant is fatal: without the encoding table, root and install
/// nothing can be resolved.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// A build config field the pipeline depends on is absent
    #[error("Build config has no {0}")]
    MissingConfigField(&'static str),

    /// A load-bearing table's content key is not in the encoding table
    #[error("Encoding table has no entry for {table} ({content_key})")]
    MissingEncodingEntry {
        /// Table being loaded
        table: &'static str,
        /// Its content key
        content_key: ContentKey,
    },

    /// The builder was finished without an encoding table
    #[error("No encoding table attached")]
    NoEncodingTable,

    /// Config value is not a valid hex hash
    #[error("Invalid hash '{0}' in config")]
    InvalidHash(String),

    /// Discovery or download failure
    #[error("Protocol error: {0}")]
    Protocol(#[from] cascfetch_protocol::ProtocolError),

    /// Cache could not be opened
    #[error("Cache error: {0}")]
    Cache(#[from] cascfetch_cache::CacheError),

    /// Local installation could not be opened
    #[error("Local storage error: {0}")]
    Storage(#[from] cascfetch_client_storage::StorageError),

    /// Build or CDN config is malformed
    #[error("Config error: {0}")]
    Config(#[from] cascfetch_formats::config::ConfigError),

    /// Encoding table failed to load
    #[error("Encoding table error: {0}")]
    Encoding(#[from] cascfetch_formats::encoding::EncodingError),

    /// Root failed to load
    #[error("Root error: {0}")]
    Root(#[from] cascfetch_formats::root::RootError),

    /// Install manifest failed to load
    #[error("Install error: {0}")]
    Install(#[from] cascfetch_formats::install::InstallError),

    /// Client settings are invalid
    #[error("Invalid settings: {0}")]
    Settings(#[from] ConfigError),

    /// Extra key file could not be read
    #[error("Cannot read key file {path}: {source}")]
    KeyFile {
        /// Path given
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Invalid client settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Locale name is not one of the retail locales
    #[error("Unknown locale '{0}'")]
    UnknownLocale(String),

    /// Installation path does not exist
    #[error("Installation path not found: {}", .0.display())]
    MissingInstallPath(PathBuf),

    /// Positional arguments must come in identifier/destination pairs
    #[error("Expected identifier and destination pairs, got {0} arguments")]
    UnpairedArguments(usize),
}

/// Why a data source could not produce a file
#[derive(Debug, Error)]
pub enum ExtractError {
    /// BLTE container is malformed or a key is missing
    #[error("Decode error: {0}")]
    Decode(#[from] cascfetch_formats::blte::BlteError),

    /// Decoded bytes hash to something else
    #[error("Content key mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch {
        /// Content key requested
        expected: ContentKey,
        /// MD5 of the decoded bytes
        actual: ContentKey,
    },

    /// Local read or destination write failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Local archive could not be read
    #[error("Local storage error: {0}")]
    Storage(#[from] cascfetch_client_storage::StorageError),

    /// CDN transfer failed
    #[error("Network error: {0}")]
    Network(#[from] cascfetch_protocol::ProtocolError),

    /// Cached archive could not be read
    #[error("Cache error: {0}")]
    Cache(#[from] cascfetch_cache::CacheError),

    /// The location was produced by another kind of source
    #[error("Location not served by this source")]
    ForeignLocation,
}

/// Why encryption keys could not be loaded from the key tables
///
/// Never fatal: encrypted content stays unavailable, everything else works.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Root has no entry for a key table
    #[error("Failed to find {0} file")]
    NotInRoot(&'static str),

    /// A key table could not be fetched
    #[error("Failed to fetch {table} file: {outcome}")]
    Fetch {
        /// Table name
        table: &'static str,
        /// Resolver outcome
        outcome: String,
    },

    /// A key table could not be parsed
    #[error("Failed to open {table} file: {source}")]
    Open {
        /// Table name
        table: &'static str,
        /// Parse error
        source: cascfetch_formats::db2::Db2Error,
    },

    /// Cache access failed
    #[error("Cache error: {0}")]
    Cache(#[from] cascfetch_cache::CacheError),
}
