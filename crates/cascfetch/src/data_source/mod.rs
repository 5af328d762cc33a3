//! Backends that turn an encoding key into verified file contents
//!
//! A source first answers whether it knows an encoding key at all
//! ([`DataSource::find_location`], no I/O), then reads, decodes, verifies
//! and writes the bytes ([`DataSource::extract`]). Both backends finish
//! through [`decode_verify_commit`], so a destination file only ever appears
//! whole and with the expected content key.

mod local;
mod remote;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use cascfetch_client_storage::IndexEntry;
use cascfetch_crypto::{ContentKey, EncodingKey, TactKeyStore};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::ExtractError;

pub use local::LocalSource;
pub use remote::RemoteSource;

/// Where a source keeps the bytes of one encoding key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Span of a local `data.NNN` archive, as recorded in its `.idx` journal
    LocalArchive(IndexEntry),
    /// Span of a CDN archive
    CdnArchive {
        /// Archive hash
        archive: String,
        /// Byte offset in the archive
        offset: u64,
        /// BLTE size
        size: u64,
    },
    /// Standalone CDN object named by the encoding key itself
    Loose {
        /// BLTE size
        size: u64,
    },
}

/// A backend holding BLTE-encoded content
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Name reported when this source serves a file
    fn name(&self) -> &'static str;

    /// Where this source keeps `encoding_key`, if anywhere
    fn find_location(&self, encoding_key: &EncodingKey) -> Option<Location>;

    /// Read, decode and verify the bytes at `location`, then write them to `destination`
    async fn extract(
        &self,
        location: &Location,
        encoding_key: &EncodingKey,
        destination: &Path,
        expected: &ContentKey,
        keys: &TactKeyStore,
    ) -> Result<(), ExtractError>;
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    destination.with_file_name(format!(".{name}.tmp-{}-{n}", std::process::id()))
}

/// Decode `blte`, check it against `expected` and atomically place it at `destination`
///
/// Nothing is left at `destination` or beside it when any step fails.
pub async fn decode_verify_commit(
    blte: &[u8],
    keys: &TactKeyStore,
    expected: &ContentKey,
    destination: &Path,
) -> Result<(), ExtractError> {
    let decoded = cascfetch_formats::blte::decode(blte, keys)?;
    let actual = ContentKey::from_data(&decoded);
    if actual != *expected {
        return Err(ExtractError::IntegrityMismatch {
            expected: *expected,
            actual,
        });
    }

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let temp = temp_path(destination);
    let result = async {
        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(&decoded).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp, destination).await
    }
    .await;

    if let Err(e) = result {
        if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", temp.display(), cleanup);
            }
        }
        return Err(e.into());
    }
    debug!("Wrote {} ({} bytes)", destination.display(), decoded.len());
    Ok(())
}
