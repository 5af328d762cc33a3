//! Data source over a local game installation

use std::path::Path;

use async_trait::async_trait;
use cascfetch_client_storage::LocalStorage;
use cascfetch_crypto::{ContentKey, EncodingKey, TactKeyStore};

use crate::data_source::{DataSource, Location, decode_verify_commit};
use crate::error::{ExtractError, ResolverError};

/// Reads BLTE blobs out of `Data/data` of an installed client
#[derive(Debug)]
pub struct LocalSource {
    storage: LocalStorage,
}

impl LocalSource {
    /// Open the installation at `install_path` (the directory holding `Data/`)
    pub async fn open(install_path: impl AsRef<Path>) -> Result<Self, ResolverError> {
        Ok(Self {
            storage: LocalStorage::open(install_path).await?,
        })
    }

    /// Underlying storage
    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }
}

#[async_trait]
impl DataSource for LocalSource {
    fn name(&self) -> &'static str {
        "Local"
    }

    fn find_location(&self, encoding_key: &EncodingKey) -> Option<Location> {
        self.storage.locate(encoding_key).map(Location::LocalArchive)
    }

    async fn extract(
        &self,
        location: &Location,
        encoding_key: &EncodingKey,
        destination: &Path,
        expected: &ContentKey,
        keys: &TactKeyStore,
    ) -> Result<(), ExtractError> {
        let Location::LocalArchive(entry) = location else {
            return Err(ExtractError::ForeignLocation);
        };
        let blte = self.storage.read(entry, encoding_key)?;
        decode_verify_commit(&blte, keys, expected, destination).await
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use cascfetch_client_storage::writer::LocalStorageWriter;
    use cascfetch_formats::blte::{BlteBuilder, ChunkMode};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_locate_and_extract() {
        let install = tempfile::tempdir().expect("install");
        let out = tempfile::tempdir().expect("out");
        let payload = b"local file contents".to_vec();
        let blte = BlteBuilder::single_chunk(&payload, ChunkMode::ZLib).expect("blte");
        let ekey = EncodingKey::from_data(&blte);

        let mut writer = LocalStorageWriter::new(install.path(), 0);
        writer.add(&ekey, &blte);
        writer.finish(1).expect("finish");

        let source = LocalSource::open(install.path()).await.expect("open");
        let location = source.find_location(&ekey).expect("indexed");
        let dest = out.path().join("file.txt");
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

        assert!(source.find_location(&EncodingKey::from_data(b"other")).is_none());
    }

    #[tokio::test]
    async fn test_rejects_cdn_locations() {
        let install = tempfile::tempdir().expect("install");
        LocalStorageWriter::new(install.path(), 0).finish(1).expect("finish");
        let source = LocalSource::open(install.path()).await.expect("open");

        let result = source
            .extract(
                &Location::Loose { size: 1 },
                &EncodingKey::from_data(b"k"),
                &install.path().join("x"),
                &ContentKey::from_data(b"x"),
                &TactKeyStore::empty(),
            )
            .await;
        assert!(matches!(result, Err(ExtractError::ForeignLocation)));
    }
}
