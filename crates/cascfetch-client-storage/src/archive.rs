//! Data archive (`data.NNN`) reads
//!
//! Archives are memory-mapped on first use and shared afterwards.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cascfetch_crypto::EncodingKey;
use dashmap::DashMap;
use memmap2::{Mmap, MmapOptions};
use tracing::debug;

use crate::index::IndexEntry;
use crate::local_header::{LOCAL_HEADER_SIZE, LocalHeader};
use crate::{Result, StorageError};

/// Reader over the `data.NNN` files of one directory
#[derive(Debug)]
pub struct ArchiveReader {
    base_path: PathBuf,
    archives: DashMap<u16, Arc<Mmap>>,
}

impl ArchiveReader {
    /// Reader for archives in `base_path`
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            archives: DashMap::new(),
        }
    }

    fn archive(&self, id: u16) -> Result<Arc<Mmap>> {
        if let Some(mmap) = self.archives.get(&id) {
            return Ok(Arc::clone(&mmap));
        }

        let path = self.base_path.join(format!("data.{id:03}"));
        let file = File::open(&path).map_err(|e| {
            StorageError::Archive(format!("Failed to open {}: {e}", path.display()))
        })?;

        // SAFETY: the archive is mapped read-only. A concurrent writer
        // truncating the file is outside what this reader supports.
        #[allow(unsafe_code)]
        let mmap = unsafe {
            MmapOptions::new()
                .map(&file)
                .map_err(|e| StorageError::Archive(format!("Failed to mmap archive: {e}")))?
        };
        debug!("Mapped archive {} ({} bytes)", path.display(), mmap.len());

        let mmap = Arc::new(mmap);
        self.archives.insert(id, Arc::clone(&mmap));
        Ok(mmap)
    }

    /// Raw bytes at a location, local header included
    pub fn read_raw(&self, archive_id: u16, offset: u32, size: u32) -> Result<Vec<u8>> {
        let archive = self.archive(archive_id)?;
        let start = offset as usize;
        let end = start + size as usize;
        archive.get(start..end).map(<[u8]>::to_vec).ok_or_else(|| {
            StorageError::Archive(format!(
                "Read beyond archive bounds: {start}..{end} > {}",
                archive.len()
            ))
        })
    }

    /// BLTE bytes of an entry, after checking its local header
    pub fn read_blte(&self, entry: &IndexEntry, encoding_key: &EncodingKey) -> Result<Vec<u8>> {
        if (entry.size as usize) < LOCAL_HEADER_SIZE {
            return Err(StorageError::Archive(format!(
                "Entry size {} is smaller than the local header",
                entry.size
            )));
        }
        let mut data = self.read_raw(entry.archive_id(), entry.archive_offset(), entry.size)?;

        let header = LocalHeader::from_bytes(&data)
            .ok_or_else(|| StorageError::Archive("Missing local header".to_string()))?;
        let stored = header.original_encoding_key();
        if stored[..9] != encoding_key.as_bytes()[..9] {
            return Err(StorageError::HeaderMismatch {
                expected: hex::encode(&encoding_key.as_bytes()[..9]),
                found: hex::encode(&stored[..9]),
            });
        }

        data.drain(..LOCAL_HEADER_SIZE);
        Ok(data)
    }

    /// Number of archives mapped so far
    pub fn mapped_count(&self) -> usize {
        self.archives.len()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::writer::LocalStorageWriter;
    use tempfile::TempDir;

    #[test]
    fn test_read_blte_skips_local_header() {
        let dir = TempDir::new().expect("tempdir");
        let key = EncodingKey::from_bytes([0x5A; 16]);
        let mut writer = LocalStorageWriter::new(dir.path(), 2);
        writer.add(&EncodingKey::from_bytes([1; 16]), b"BLTE first");
        let entry = writer.add(&key, b"BLTE second");
        let data_dir = writer.finish(1).expect("finish");

        let reader = ArchiveReader::new(&data_dir);
        assert_eq!(reader.read_blte(&entry, &key).expect("read"), b"BLTE second");
        assert_eq!(reader.mapped_count(), 1);

        let other = EncodingKey::from_bytes([0x5B; 16]);
        assert!(matches!(
            reader.read_blte(&entry, &other),
            Err(StorageError::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn test_out_of_bounds_and_missing_archive() {
        let dir = TempDir::new().expect("tempdir");
        let key = EncodingKey::from_bytes([7; 16]);
        let mut writer = LocalStorageWriter::new(dir.path(), 0);
        let mut entry = writer.add(&key, b"BLTE");
        let data_dir = writer.finish(1).expect("finish");
        let reader = ArchiveReader::new(&data_dir);

        entry.size += 100;
        assert!(matches!(reader.read_blte(&entry, &key), Err(StorageError::Archive(_))));

        let missing = IndexEntry::new(key.first_9(), 9, 0, 40);
        assert!(matches!(reader.read_blte(&missing, &key), Err(StorageError::Archive(_))));
    }
}
