//! Identifier to verified file, across every lookup and data source
//!
//! A request walks identifier -> content key ([`NameLookup`]s in order),
//! content key -> encoding keys ([`EncodingTable`]), then tries every
//! encoding key against every [`DataSource`] in priority order. Failures
//! along the way are values: each one becomes an [`Attempt`] that is logged,
//! handed to the optional callback and returned when nothing succeeds.

use std::fmt;
use std::path::Path;

use cascfetch_crypto::{ContentKey, EncodingKey, TactKey, TactKeyStore};
use cascfetch_formats::encoding::EncodingTable;
use cascfetch_formats::root::LocaleFlags;
use tracing::{debug, info, warn};

use crate::data_source::DataSource;
use crate::error::{ExtractError, ResolverError};
use crate::identifier::Identifier;
use crate::name_lookup::NameLookup;

/// Callback receiving every failed attempt as it happens
pub type AttemptCallback = Box<dyn Fn(&Attempt) + Send + Sync>;

/// Why one (encoding key, source) pair did not produce the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The source does not know the encoding key
    LocationMiss,
    /// BLTE decoding failed, including missing encryption keys
    Decode(String),
    /// Decoded bytes hashed to another content key
    IntegrityMismatch {
        /// Requested content key
        expected: ContentKey,
        /// Digest of what was decoded
        actual: ContentKey,
    },
    /// Reading the source or writing the destination failed
    Io(String),
    /// Download failed
    Network(String),
}

impl From<&ExtractError> for FailureKind {
    fn from(error: &ExtractError) -> Self {
        match error {
            ExtractError::Decode(e) => Self::Decode(e.to_string()),
            ExtractError::IntegrityMismatch { expected, actual } => Self::IntegrityMismatch {
                expected: *expected,
                actual: *actual,
            },
            ExtractError::Network(e) => Self::Network(e.to_string()),
            ExtractError::Io(_)
            | ExtractError::Storage(_)
            | ExtractError::Cache(_)
            | ExtractError::ForeignLocation => Self::Io(error.to_string()),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocationMiss => f.write_str("not indexed"),
            Self::Decode(e) => write!(f, "decode failed: {e}"),
            Self::IntegrityMismatch { expected, actual } => {
                write!(f, "content key mismatch: expected {expected}, got {actual}")
            }
            Self::Io(e) => write!(f, "I/O failed: {e}"),
            Self::Network(e) => write!(f, "download failed: {e}"),
        }
    }
}

/// One failed (encoding key, source) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// Encoding key tried
    pub encoding_key: EncodingKey,
    /// Source tried
    pub source: &'static str,
    /// What went wrong
    pub failure: FailureKind,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {}: {}", self.encoding_key, self.source, self.failure)
    }
}

/// Result of [`ContentResolver::fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination already held the right bytes; no source was asked
    AlreadyExists,
    /// Written by `source` from `encoding_key`
    Fetched {
        /// Winning source
        source: &'static str,
        /// Encoding that was decoded
        encoding_key: EncodingKey,
    },
    /// The identifier or its content key is unknown
    NotFound,
    /// Known, but every encoding failed in every source
    Unavailable {
        /// Every failure in the order it happened
        attempts: Vec<Attempt>,
    },
}

impl FetchOutcome {
    /// Whether the destination now holds the file
    pub fn is_success(&self) -> bool {
        matches!(self, Self::AlreadyExists | Self::Fetched { .. })
    }

    /// Name of the source that served the file
    pub fn source(&self) -> Option<&'static str> {
        match self {
            Self::Fetched { source, .. } => Some(*source),
            _ => None,
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists => f.write_str("already exists"),
            Self::Fetched { source, .. } => write!(f, "fetched from {source}"),
            Self::NotFound => f.write_str("not found"),
            Self::Unavailable { attempts } => {
                write!(f, "unavailable after {} attempts", attempts.len())
            }
        }
    }
}

/// Builder fixing the lookup and source order of a [`ContentResolver`]
#[derive(Default)]
pub struct ContentResolverBuilder {
    lookups: Vec<Box<dyn NameLookup>>,
    sources: Vec<Box<dyn DataSource>>,
    encoding: Option<EncodingTable>,
    keys: Option<TactKeyStore>,
    on_attempt: Option<AttemptCallback>,
}

impl ContentResolverBuilder {
    /// Append a name lookup; earlier lookups are asked first
    #[must_use]
    pub fn name_lookup(mut self, lookup: impl NameLookup + 'static) -> Self {
        self.lookups.push(Box::new(lookup));
        self
    }

    /// Append a data source; earlier sources are tried first
    #[must_use]
    pub fn data_source(mut self, source: impl DataSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Attach the encoding table
    #[must_use]
    pub fn encoding(mut self, encoding: EncodingTable) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Attach the key store; defaults to [`TactKeyStore::new`]
    #[must_use]
    pub fn keys(mut self, keys: TactKeyStore) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Receive every failed attempt as it happens
    #[must_use]
    pub fn on_attempt(mut self, callback: impl Fn(&Attempt) + Send + Sync + 'static) -> Self {
        self.on_attempt = Some(Box::new(callback));
        self
    }

    /// Finish; an encoding table is required
    pub fn build(self) -> Result<ContentResolver, ResolverError> {
        let encoding = self.encoding.ok_or(ResolverError::NoEncodingTable)?;
        debug!(
            "Resolver lookups: [{}], sources: [{}]",
            self.lookups.iter().map(|l| l.name()).collect::<Vec<_>>().join(", "),
            self.sources.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
        );
        Ok(ContentResolver {
            lookups: self.lookups,
            sources: self.sources,
            encoding,
            keys: self.keys.unwrap_or_default(),
            on_attempt: self.on_attempt,
        })
    }
}

impl fmt::Debug for ContentResolverBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentResolverBuilder")
            .field("lookups", &self.lookups.len())
            .field("sources", &self.sources.len())
            .field("encoding", &self.encoding.is_some())
            .finish_non_exhaustive()
    }
}

/// Turns identifiers into verified files
pub struct ContentResolver {
    lookups: Vec<Box<dyn NameLookup>>,
    sources: Vec<Box<dyn DataSource>>,
    encoding: EncodingTable,
    keys: TactKeyStore,
    on_attempt: Option<AttemptCallback>,
}

impl ContentResolver {
    /// Start a builder
    pub fn builder() -> ContentResolverBuilder {
        ContentResolverBuilder::default()
    }

    /// Content key of `identifier` from the first lookup that knows it
    pub fn resolve_identifier(
        &self,
        identifier: &Identifier,
        locale: Option<LocaleFlags>,
    ) -> Option<ContentKey> {
        self.lookups.iter().find_map(|lookup| {
            let found = lookup.content_key(identifier, locale)?;
            debug!("{} resolved {} to {}", lookup.name(), identifier, found);
            Some(found)
        })
    }

    /// Write the file named by `identifier` to `destination`
    ///
    /// Returns [`FetchOutcome::AlreadyExists`] without asking any source when
    /// `destination` already hashes to the resolved content key.
    pub async fn fetch(
        &self,
        identifier: &str,
        destination: &Path,
        locale: Option<LocaleFlags>,
    ) -> FetchOutcome {
        let identifier = Identifier::parse(identifier);
        let Some(content_key) = self.resolve_identifier(&identifier, locale) else {
            info!("No content key for {}", identifier);
            return FetchOutcome::NotFound;
        };
        if already_present(destination, &content_key).await {
            debug!("{} already holds {}", destination.display(), content_key);
            return FetchOutcome::AlreadyExists;
        }
        self.fetch_content(&content_key, destination).await
    }

    /// Write the content behind `content_key` to `destination`
    pub async fn fetch_content(&self, content_key: &ContentKey, destination: &Path) -> FetchOutcome {
        let Some(map) = self.encoding.content_map(content_key) else {
            info!("Encoding table has no entry for {}", content_key);
            return FetchOutcome::NotFound;
        };

        let mut attempts = Vec::new();
        for encoding_key in &map.encoding_keys {
            for source in &self.sources {
                let Some(location) = source.find_location(encoding_key) else {
                    self.record(&mut attempts, *encoding_key, source.name(), FailureKind::LocationMiss);
                    continue;
                };
                match source
                    .extract(&location, encoding_key, destination, content_key, &self.keys)
                    .await
                {
                    Ok(()) => {
                        debug!("{} served {} as {}", source.name(), content_key, encoding_key);
                        return FetchOutcome::Fetched {
                            source: source.name(),
                            encoding_key: *encoding_key,
                        };
                    }
                    Err(e) => {
                        self.record(&mut attempts, *encoding_key, source.name(), FailureKind::from(&e));
                    }
                }
            }
        }
        warn!("Content {} unavailable from every source", content_key);
        FetchOutcome::Unavailable { attempts }
    }

    fn record(
        &self,
        attempts: &mut Vec<Attempt>,
        encoding_key: EncodingKey,
        source: &'static str,
        failure: FailureKind,
    ) {
        let attempt = Attempt {
            encoding_key,
            source,
            failure,
        };
        match attempt.failure {
            FailureKind::LocationMiss => debug!("{}", attempt),
            _ => warn!("{}", attempt),
        }
        if let Some(callback) = &self.on_attempt {
            callback(&attempt);
        }
        attempts.push(attempt);
    }

    /// Encoding table
    pub fn encoding(&self) -> &EncodingTable {
        &self.encoding
    }

    /// Key store used for every decode
    pub fn keys(&self) -> &TactKeyStore {
        &self.keys
    }

    /// Merge keys into the store; returns how many were new or changed
    pub fn add_keys(&mut self, keys: impl IntoIterator<Item = TactKey>) -> usize {
        self.keys.extend(keys)
    }

    /// Source names in priority order
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

impl fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentResolver")
            .field("lookups", &self.lookups.iter().map(|l| l.name()).collect::<Vec<_>>())
            .field("sources", &self.source_names())
            .field("encodings", &self.encoding.len())
            .field("keys", &self.keys.len())
            .finish_non_exhaustive()
    }
}

async fn already_present(destination: &Path, expected: &ContentKey) -> bool {
    let path = destination.to_path_buf();
    let digest = tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(path).ok()?;
        ContentKey::from_reader(std::io::BufReader::new(file)).ok()
    })
    .await
    .ok()
    .flatten();
    digest.as_ref() == Some(expected)
}
