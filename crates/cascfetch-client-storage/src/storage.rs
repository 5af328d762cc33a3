//! Installation entry point

use std::path::{Path, PathBuf};

use cascfetch_crypto::EncodingKey;
use tracing::info;

use crate::archive::ArchiveReader;
use crate::index::{IndexEntry, IndexManager};
use crate::{Result, StorageError};

/// A local installation opened for reading
#[derive(Debug)]
pub struct LocalStorage {
    data_path: PathBuf,
    indices: IndexManager,
    archives: ArchiveReader,
}

impl LocalStorage {
    /// Open the installation rooted at `install_path`
    ///
    /// The path is the directory that contains `Data/`, for example a
    /// `_retail_` folder.
    pub async fn open(install_path: impl AsRef<Path>) -> Result<Self> {
        let data_path = install_path.as_ref().join("Data").join("data");
        if !tokio::fs::try_exists(&data_path).await.unwrap_or(false) {
            return Err(StorageError::Installation(format!(
                "{} does not exist",
                data_path.display()
            )));
        }

        let indices = IndexManager::load_dir(&data_path).await?;
        info!(
            "Opened local storage at {} ({} entries)",
            data_path.display(),
            indices.entry_count()
        );
        Ok(Self {
            archives: ArchiveReader::new(&data_path),
            data_path,
            indices,
        })
    }

    /// Index entry for an encoding key
    pub fn locate(&self, encoding_key: &EncodingKey) -> Option<IndexEntry> {
        self.indices.lookup(encoding_key)
    }

    /// BLTE bytes stored for an entry
    pub fn read(&self, entry: &IndexEntry, encoding_key: &EncodingKey) -> Result<Vec<u8>> {
        self.archives.read_blte(entry, encoding_key)
    }

    /// `Data/data` directory
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Loaded journals
    pub fn indices(&self) -> &IndexManager {
        &self.indices
    }
}
