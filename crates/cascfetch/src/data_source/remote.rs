//! Data source over CDN archives

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cascfetch_cache::{CacheKey, DiskCache};
use cascfetch_crypto::{ContentKey, EncodingKey, TactKeyStore};
use cascfetch_formats::archive::ArchiveIndex;
use cascfetch_protocol::CdnClient;
use futures::stream::{self, StreamExt};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, warn};

use crate::data_source::{DataSource, Location, decode_verify_commit};
use crate::error::ExtractError;

/// Archive indexes downloaded at once
const INDEX_CONCURRENCY: usize = 8;

/// Resolves encoding keys through CDN archive indexes and fetches byte ranges
#[derive(Debug)]
pub struct RemoteSource {
    cdn: CdnClient,
    cache: Option<Arc<DiskCache>>,
    locations: HashMap<EncodingKey, Location>,
}

impl RemoteSource {
    /// Load the indexes of `archives` and, when given, the loose-file index
    ///
    /// Indexes already present in an installation's `Data/indices` are read
    /// from there instead of the CDN. An index that cannot be loaded is
    /// logged and skipped; its archive's contents are then unknown to this
    /// source. When two archives list the same key, the earlier one wins.
    pub async fn open(
        cdn: CdnClient,
        cache: Option<Arc<DiskCache>>,
        archives: &[&str],
        file_index: Option<&str>,
        install_path: Option<&Path>,
    ) -> Self {
        let indices_dir = install_path.map(|p| p.join("Data").join("indices"));
        let loaded: Vec<(String, Option<ArchiveIndex>)> = stream::iter(archives.iter().copied())
            .map(|hash| {
                let cdn = &cdn;
                let indices_dir = indices_dir.as_deref();
                async move {
                    let index = load_index(cdn, indices_dir, hash).await;
                    (hash.to_string(), index)
                }
            })
            .buffered(INDEX_CONCURRENCY)
            .collect()
            .await;

        let mut locations = HashMap::new();
        let mut failed = 0usize;
        for (hash, index) in loaded {
            let Some(index) = index else {
                failed += 1;
                continue;
            };
            for entry in index.entries() {
                let Some(key) = encoding_key(&entry.key) else {
                    continue;
                };
                locations.entry(key).or_insert_with(|| Location::CdnArchive {
                    archive: hash.clone(),
                    offset: entry.offset,
                    size: u64::from(entry.size),
                });
            }
        }

        if let Some(hash) = file_index {
            if let Some(index) = load_index(&cdn, indices_dir.as_deref(), hash).await {
                for entry in index.entries() {
                    if let Some(key) = encoding_key(&entry.key) {
                        locations.entry(key).or_insert(Location::Loose {
                            size: u64::from(entry.size),
                        });
                    }
                }
            } else {
                failed += 1;
            }
        }

        info!(
            "Loaded {} archive indexes ({} keys, {} failed)",
            archives.len() + usize::from(file_index.is_some()) - failed,
            locations.len(),
            failed
        );
        Self {
            cdn,
            cache,
            locations,
        }
    }

    /// Number of encoding keys this source can serve
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether no archive index was loaded
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    async fn fetch(
        &self,
        object: &str,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, ExtractError> {
        if let Some(path) = self.cached_object(object).await {
            debug!("Reading {} bytes of {} from cache", size, object);
            return Ok(read_range(&path, offset, size).await?);
        }
        Ok(self.cdn.data_range(object, offset, size).await?.to_vec())
    }

    async fn cached_object(&self, object: &str) -> Option<PathBuf> {
        let cache = self.cache.as_ref()?;
        let key = CacheKey::archive(object).ok()?;
        cache.exists(&key).await.then(|| cache.full_path(&key))
    }
}

fn encoding_key(raw: &[u8]) -> Option<EncodingKey> {
    <[u8; 16]>::try_from(raw).ok().map(EncodingKey::from_bytes)
}

async fn load_index(cdn: &CdnClient, indices_dir: Option<&Path>, hash: &str) -> Option<ArchiveIndex> {
    let local = indices_dir.map(|dir| dir.join(format!("{hash}.index")));
    let bytes = match local {
        Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
            tokio::fs::read(&path).await.map_err(|e| e.to_string())
        }
        _ => cdn
            .archive_index(hash)
            .await
            .map(|b| b.to_vec())
            .map_err(|e| e.to_string()),
    };
    match bytes.and_then(|b| ArchiveIndex::parse(&b).map_err(|e| e.to_string())) {
        Ok(index) => Some(index),
        Err(e) => {
            warn!("Skipping archive index {}: {}", hash, e);
            None
        }
    }
}

async fn read_range(path: &Path, offset: u64, size: u64) -> std::io::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    file.seek(SeekFrom::Start(offset)).await?;
    let mut buf = vec![0; size as usize];
    file.read_exact(&mut buf).await?;
    Ok(buf)
}

#[async_trait]
impl DataSource for RemoteSource {
    fn name(&self) -> &'static str {
        "Remote"
    }

    fn find_location(&self, encoding_key: &EncodingKey) -> Option<Location> {
        self.locations.get(encoding_key).cloned()
    }

    async fn extract(
        &self,
        location: &Location,
        encoding_key: &EncodingKey,
        destination: &Path,
        expected: &ContentKey,
        keys: &TactKeyStore,
    ) -> Result<(), ExtractError> {
        let blte = match location {
            Location::CdnArchive {
                archive,
                offset,
                size,
            } => self.fetch(archive, *offset, *size).await?,
            Location::Loose { size } => self.fetch(&encoding_key.to_hex(), 0, *size).await?,
            Location::LocalArchive(_) => return Err(ExtractError::ForeignLocation),
        };
        decode_verify_commit(&blte, keys, expected, destination).await
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use cascfetch_formats::archive::ArchiveIndexBuilder;
    use cascfetch_formats::blte::{BlteBuilder, ChunkMode};
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARCHIVE_A: &str = "aaaa0000000000000000000000000000";
    const ARCHIVE_B: &str = "bbbb0000000000000000000000000000";
    const FILE_INDEX: &str = "ffff0000000000000000000000000000";

    fn cdn(server: &MockServer) -> CdnClient {
        CdnClient::new(vec![server.address().to_string()], "tpr/wow")
            .expect("client")
            .with_retry_policy(cascfetch_protocol::RetryPolicy::none())
    }

    async fn serve_index(server: &MockServer, hash: &str, body: Vec<u8>) {
        Mock::given(method("GET"))
            .and(path(format!("/tpr/wow/data/{}/{}/{hash}.index", &hash[..2], &hash[2..4])))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_first_archive_wins_and_loose_files_are_indexed() {
        let server = MockServer::start().await;
        let shared = EncodingKey::from_data(b"shared");
        let only_b = EncodingKey::from_data(b"only b");
        let loose = EncodingKey::from_data(b"loose");
        serve_index(
            &server,
            ARCHIVE_A,
            ArchiveIndexBuilder::new().entry(shared, 10, 100).build(),
        )
        .await;
        serve_index(
            &server,
            ARCHIVE_B,
            ArchiveIndexBuilder::new()
                .entry(shared, 10, 500)
                .entry(only_b, 20, 0)
                .build(),
        )
        .await;
        serve_index(
            &server,
            FILE_INDEX,
            ArchiveIndexBuilder::new().offset_bytes(0).entry(loose, 30, 0).build(),
        )
        .await;

        let source = RemoteSource::open(
            cdn(&server),
            None,
            &[ARCHIVE_A, ARCHIVE_B],
            Some(FILE_INDEX),
            None,
        )
        .await;
        assert_eq!(source.len(), 3);
        assert_eq!(
            source.find_location(&shared),
            Some(Location::CdnArchive {
                archive: ARCHIVE_A.to_string(),
                offset: 100,
                size: 10
            })
        );
        assert_eq!(
            source.find_location(&only_b),
            Some(Location::CdnArchive {
                archive: ARCHIVE_B.to_string(),
                offset: 0,
                size: 20
            })
        );
        assert_eq!(source.find_location(&loose), Some(Location::Loose { size: 30 }));
    }

    #[tokio::test]
    async fn test_failed_index_is_skipped() {
        let server = MockServer::start().await;
        let key = EncodingKey::from_data(b"present");
        serve_index(&server, ARCHIVE_B, ArchiveIndexBuilder::new().entry(key, 1, 0).build()).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = RemoteSource::open(cdn(&server), None, &[ARCHIVE_A, ARCHIVE_B], None, None).await;
        assert_eq!(source.len(), 1);
        assert!(source.find_location(&key).is_some());
    }

    #[tokio::test]
    async fn test_index_read_from_installation() {
        let server = MockServer::start().await;
        let install = tempfile::tempdir().expect("install");
        let indices = install.path().join("Data").join("indices");
        std::fs::create_dir_all(&indices).expect("mkdir");
        let key = EncodingKey::from_data(b"on disk");
        std::fs::write(
            indices.join(format!("{ARCHIVE_A}.index")),
            ArchiveIndexBuilder::new().entry(key, 5, 50).build(),
        )
        .expect("write");

        let source =
            RemoteSource::open(cdn(&server), None, &[ARCHIVE_A], None, Some(install.path())).await;
        assert!(source.find_location(&key).is_some());
        assert!(server.received_requests().await.expect("recording").is_empty());
    }

    #[tokio::test]
    async fn test_extract_archive_range() {
        let server = MockServer::start().await;
        let payload = b"remote payload".to_vec();
        let blte = BlteBuilder::single_chunk(&payload, ChunkMode::ZLib).expect("blte");
        let ekey = EncodingKey::from_data(&blte);
        let end = 64 + blte.len() - 1;
        Mock::given(method("GET"))
            .and(path(format!("/tpr/wow/data/aa/aa/{ARCHIVE_A}")))
            .and(header("range", format!("bytes=64-{end}").as_str()))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(blte.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let source = RemoteSource::open(cdn(&server), None, &[], None, None).await;
        let out = tempfile::tempdir().expect("out");
        let dest = out.path().join("payload.bin");
        let location = Location::CdnArchive {
            archive: ARCHIVE_A.to_string(),
            offset: 64,
            size: blte.len() as u64,
        };
        source
            .extract(
                &location,
                &ekey,
                &dest,
                &ContentKey::from_data(&payload),
                &TactKeyStore::empty(),
            )
            .await
            .expect("extract");
        assert_eq!(std::fs::read(dest).expect("read"), payload);
    }

    #[tokio::test]
    async fn test_extract_prefers_cached_archive() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("cache");
        let cache = Arc::new(DiskCache::open(dir.path()).await.expect("open"));
        let payload = b"cached archive member".to_vec();
        let blte = BlteBuilder::single_chunk(&payload, ChunkMode::None).expect("blte");
        let mut archive = vec![0u8; 16];
        archive.extend_from_slice(&blte);
        cache
            .write(&CacheKey::archive(ARCHIVE_B).expect("key"), &archive)
            .await
            .expect("write");

        let source = RemoteSource::open(cdn(&server), Some(cache), &[], None, None).await;
        let out = tempfile::tempdir().expect("out");
        let dest = out.path().join("member.bin");
        source
            .extract(
                &Location::CdnArchive {
                    archive: ARCHIVE_B.to_string(),
                    offset: 16,
                    size: blte.len() as u64,
                },
                &EncodingKey::from_data(&blte),
                &dest,
                &ContentKey::from_data(&payload),
                &TactKeyStore::empty(),
            )
            .await
            .expect("extract");
        assert_eq!(std::fs::read(dest).expect("read"), payload);
        assert!(server.received_requests().await.expect("recording").is_empty());
    }

    #[tokio::test]
    async fn test_rejects_local_locations() {
        let server = MockServer::start().await;
        let source = RemoteSource::open(cdn(&server), None, &[], None, None).await;
        let ekey = EncodingKey::from_data(b"k");
        let entry = cascfetch_client_storage::IndexEntry::new(ekey.first_9(), 0, 0, 1);
        let result = source
            .extract(
                &Location::LocalArchive(entry),
                &ekey,
                std::path::Path::new("unused"),
                &ContentKey::from_data(b"x"),
                &TactKeyStore::empty(),
            )
            .await;
        assert!(matches!(result, Err(ExtractError::ForeignLocation)));
    }
}
