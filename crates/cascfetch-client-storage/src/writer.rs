//! Writers producing installation fixtures
//!
//! [`LocalStorageWriter`] packs BLTE blobs into one `data.NNN` archive
//! behind local headers and writes a v7 journal per bucket that points
//! at them.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use binrw::BinWrite;
use cascfetch_crypto::{EncodingKey, hashlittle2};

use crate::index::{GuardedBlockHeader, IndexEntry, IndexHeaderV2, bucket_for_key};
use crate::local_header::{LOCAL_HEADER_SIZE, LocalHeader};
use crate::{Result, StorageError};

fn guarded(data: &[u8]) -> Result<Vec<u8>> {
    let block = GuardedBlockHeader {
        block_size: data.len() as u32,
        block_hash: hashlittle2(data, 0, 0).0,
    };
    let mut cursor = Cursor::new(Vec::new());
    block
        .write(&mut cursor)
        .map_err(|e| StorageError::Index(format!("Failed to write block header: {e}")))?;
    Ok(cursor.into_inner())
}

/// Serialize a v7 journal for one bucket
pub fn index_file_bytes(bucket: u8, entries: &[IndexEntry]) -> Result<Vec<u8>> {
    let mut header = Cursor::new(Vec::new());
    IndexHeaderV2::new(bucket)
        .write(&mut header)
        .map_err(|e| StorageError::Index(format!("Failed to write header: {e}")))?;
    let header = header.into_inner();

    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| e.key);
    let mut entry_data = Vec::with_capacity(sorted.len() * 18);
    for entry in &sorted {
        entry_data.extend_from_slice(&entry.to_bytes()?);
    }

    let mut out = guarded(&header)?;
    out.extend_from_slice(&header);
    out.resize(out.len().next_multiple_of(16), 0);
    out.extend(guarded(&entry_data)?);
    out.extend_from_slice(&entry_data);
    Ok(out)
}

/// Builds `Data/data` below an installation root
#[derive(Debug)]
pub struct LocalStorageWriter {
    root: PathBuf,
    archive_id: u16,
    data: Vec<u8>,
    entries: Vec<IndexEntry>,
}

impl LocalStorageWriter {
    /// Writer for the installation at `root` storing into `data.{archive_id:03}`
    pub fn new(root: impl AsRef<Path>, archive_id: u16) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            archive_id,
            data: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Append a BLTE blob and index it under `encoding_key`
    pub fn add(&mut self, encoding_key: &EncodingKey, blte: &[u8]) -> IndexEntry {
        let offset = self.data.len() as u32;
        let header = LocalHeader::new(*encoding_key.as_bytes(), blte.len() as u32);
        self.data.extend_from_slice(&header.to_bytes());
        self.data.extend_from_slice(blte);
        let entry = IndexEntry::new(
            encoding_key.first_9(),
            self.archive_id,
            offset,
            (LOCAL_HEADER_SIZE + blte.len()) as u32,
        );
        self.entries.push(entry.clone());
        entry
    }

    /// Directory holding the archive and journals
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("Data").join("data")
    }

    /// Write the archive and one journal per used bucket at `version`
    pub fn finish(self, version: u32) -> Result<PathBuf> {
        let dir = self.data_dir();
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(format!("data.{:03}", self.archive_id)), &self.data)?;

        let mut buckets: BTreeMap<u8, Vec<IndexEntry>> = BTreeMap::new();
        for entry in self.entries {
            buckets.entry(bucket_for_key(&entry.key)).or_default().push(entry);
        }
        for (bucket, entries) in buckets {
            std::fs::write(
                dir.join(format!("{bucket:02x}{version:08x}.idx")),
                index_file_bytes(bucket, &entries)?,
            )?;
        }
        Ok(dir)
    }
}
