//! Index journal (`.idx`) loading
//!
//! Each of the sixteen buckets is described by a file named
//! `{bucket:02x}{version:08x}.idx`; only the highest version of a bucket
//! is current. A v7 journal is laid out as:
//!
//! ```text
//! [0x00] GuardedBlockHeader (8 bytes): header size + Jenkins hash
//! [0x08] IndexHeaderV2 (16 bytes)
//! [0x18] padding (8 bytes)
//! [0x20] GuardedBlockHeader (8 bytes): entry data size + Jenkins hash
//! [0x28] 18-byte entries
//! ```
//!
//! Lookups take the bucket of the key and binary search its sorted
//! entries on the 9-byte key prefix.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use binrw::{BinRead, BinReaderExt, BinResult, BinWrite, BinWriterExt, Endian};
use cascfetch_crypto::EncodingKey;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{Result, StorageError};

/// Journal version this reader understands
pub const INDEX_VERSION: u16 = 7;

/// Size of one packed entry
pub const ENTRY_SIZE: usize = 18;

/// Archive number and offset packed into 5 big-endian bytes
///
/// The top 10 bits are the archive number, the low 30 bits the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLocation {
    /// Archive file number (`data.NNN`)
    pub archive_id: u16,
    /// Offset within the archive
    pub archive_offset: u32,
}

fn parse_archive_location<R: std::io::Read + std::io::Seek>(
    reader: &mut R,
    _endian: Endian,
    _args: (),
) -> BinResult<ArchiveLocation> {
    let index_high = u16::from(reader.read_be::<u8>()?);
    let index_low = reader.read_be::<u32>()?;
    Ok(ArchiveLocation {
        archive_id: (index_high << 2) | (index_low >> 30) as u16,
        archive_offset: index_low & 0x3FFF_FFFF,
    })
}

fn write_archive_location<W: std::io::Write + std::io::Seek>(
    location: &ArchiveLocation,
    writer: &mut W,
    _endian: Endian,
    _args: (),
) -> BinResult<()> {
    let index_high = u8::try_from(location.archive_id >> 2).map_err(|e| binrw::Error::AssertFail {
        pos: 0,
        message: format!("Archive ID too large: {e}"),
    })?;
    writer.write_be(&index_high)?;
    let index_low =
        (u32::from(location.archive_id & 0x03) << 30) | (location.archive_offset & 0x3FFF_FFFF);
    writer.write_be(&index_low)?;
    Ok(())
}

/// Guarded block header (size + hash)
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
pub struct GuardedBlockHeader {
    /// Size of the block data
    pub block_size: u32,
    /// Jenkins hash of the block data
    pub block_hash: u32,
}

/// IDX journal header, little-endian unlike most NGDP formats
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
pub struct IndexHeaderV2 {
    /// Journal version (must be 0x07)
    pub version: u16,
    /// Bucket ID (0x00-0x0F)
    pub bucket: u8,
    /// Extra bytes (must be 0)
    pub extra_bytes: u8,
    /// Size field bytes (4)
    pub encoded_size_length: u8,
    /// Location field bytes (5)
    pub storage_offset_length: u8,
    /// Key field bytes (9)
    pub ekey_length: u8,
    /// File offset bits (30)
    pub file_offset_bits: u8,
    /// Size of one data segment
    pub segment_size: u64,
}

impl IndexHeaderV2 {
    /// Serialized size
    pub const SIZE: usize = 16;

    /// Standard v7 header for a bucket
    pub fn new(bucket: u8) -> Self {
        Self {
            version: INDEX_VERSION,
            bucket,
            extra_bytes: 0,
            encoded_size_length: 4,
            storage_offset_length: 5,
            ekey_length: 9,
            file_offset_bits: 30,
            segment_size: 1 << 30,
        }
    }
}

/// Entry in an index journal (18 bytes)
///
/// Mixed endianness: the location is big-endian but the size that
/// follows it is little-endian.
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct IndexEntry {
    /// Truncated encoding key (first 9 bytes)
    pub key: [u8; 9],

    /// Archive number and offset
    #[br(parse_with = parse_archive_location)]
    #[bw(write_with = write_archive_location)]
    pub location: ArchiveLocation,

    /// Stored size including the 30-byte local header
    #[brw(little)]
    pub size: u32,
}

impl IndexEntry {
    /// Create an entry
    pub const fn new(key: [u8; 9], archive_id: u16, archive_offset: u32, size: u32) -> Self {
        Self {
            key,
            location: ArchiveLocation {
                archive_id,
                archive_offset,
            },
            size,
        }
    }

    /// Archive number
    pub const fn archive_id(&self) -> u16 {
        self.location.archive_id
    }

    /// Offset of the local header within the archive
    pub const fn archive_offset(&self) -> u32 {
        self.location.archive_offset
    }

    /// Serialize to the 18-byte packed form
    pub fn to_bytes(&self) -> Result<[u8; ENTRY_SIZE]> {
        let mut cursor = Cursor::new([0u8; ENTRY_SIZE]);
        self.write(&mut cursor)
            .map_err(|e| StorageError::Index(format!("Failed to serialize entry: {e}")))?;
        Ok(cursor.into_inner())
    }
}

/// Bucket of a key: XOR of the first 9 bytes, folded nibble-wise
pub fn bucket_for_key(key: &[u8]) -> u8 {
    let hash = key.iter().take(9).fold(0u8, |acc, &b| acc ^ b);
    (hash & 0x0F) ^ (hash >> 4)
}

/// Parse `{bucket:02x}{version:08x}.idx`
pub fn parse_index_filename(filename: &str) -> Option<(u8, u32)> {
    let stem = filename.strip_suffix(".idx")?;
    if stem.len() != 10 || !stem.is_ascii() {
        return None;
    }
    let bucket = u8::from_str_radix(&stem[0..2], 16).ok()?;
    let version = u32::from_str_radix(&stem[2..10], 16).ok()?;
    Some((bucket, version))
}

/// Parse a whole journal into its header and entries
pub fn parse_index(data: &[u8]) -> Result<(IndexHeaderV2, Vec<IndexEntry>)> {
    let mut cursor = Cursor::new(data);
    let header_block: GuardedBlockHeader = cursor
        .read_le()
        .map_err(|e| StorageError::Index(format!("Failed to read header block: {e}")))?;
    let header: IndexHeaderV2 = cursor
        .read_le()
        .map_err(|e| StorageError::Index(format!("Failed to read header: {e}")))?;

    if header.version != INDEX_VERSION {
        return Err(StorageError::Index(format!(
            "Unsupported index version: {}",
            header.version
        )));
    }
    let entry_size = usize::from(header.ekey_length)
        + usize::from(header.storage_offset_length)
        + usize::from(header.encoded_size_length);
    if entry_size != ENTRY_SIZE || header.ekey_length != 9 {
        return Err(StorageError::Index(format!(
            "Unsupported entry layout: key {} location {} size {}",
            header.ekey_length, header.storage_offset_length, header.encoded_size_length
        )));
    }

    // Entries start at the next 16-byte boundary after the header block
    let entries_block = (8 + header_block.block_size as usize).next_multiple_of(16);
    let entry_block: GuardedBlockHeader = BinRead::read_le(&mut Cursor::new(
        data.get(entries_block..entries_block + 8)
            .ok_or_else(|| StorageError::Index("Missing entry block header".to_string()))?,
    ))
    .map_err(|e| StorageError::Index(format!("Failed to read entry block header: {e}")))?;

    let start = entries_block + 8;
    let end = start + entry_block.block_size as usize;
    let entry_data = data.get(start..end).ok_or_else(|| {
        StorageError::Index(format!(
            "Entry block truncated: need {end} bytes, have {}",
            data.len()
        ))
    })?;

    let mut entries: Vec<IndexEntry> = entry_data
        .chunks_exact(ENTRY_SIZE)
        .filter(|bytes| bytes[..9].iter().any(|&b| b != 0))
        .filter_map(|bytes| IndexEntry::read(&mut Cursor::new(bytes)).ok())
        .collect();
    entries.sort_by_key(|e| e.key);
    Ok((header, entries))
}

/// Index journals of one installation, newest version per bucket
#[derive(Debug, Default)]
pub struct IndexManager {
    buckets: BTreeMap<u8, (u32, Vec<IndexEntry>)>,
}

impl IndexManager {
    /// Empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the newest journal of every bucket found in `dir`
    pub async fn load_dir(dir: &Path) -> Result<Self> {
        info!("Loading index files from {}", dir.display());

        let mut newest: BTreeMap<u8, (u32, std::path::PathBuf)> = BTreeMap::new();
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| StorageError::Index(format!("Failed to read directory: {e}")))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some((bucket, version)) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_index_filename)
            else {
                continue;
            };
            if newest.get(&bucket).is_none_or(|(v, _)| version > *v) {
                newest.insert(bucket, (version, path));
            }
        }

        let mut manager = Self::new();
        for (bucket, (version, path)) in newest {
            let data = fs::read(&path).await?;
            match parse_index(&data) {
                Ok((header, entries)) => {
                    if header.bucket != bucket {
                        warn!(
                            "Index {} declares bucket {:02x}",
                            path.display(),
                            header.bucket
                        );
                    }
                    debug!(
                        "Loaded {} entries from bucket {:02x} version {:08x}",
                        entries.len(),
                        bucket,
                        version
                    );
                    manager.insert(bucket, version, entries);
                }
                Err(e) => warn!("Skipping index {}: {}", path.display(), e),
            }
        }

        info!(
            "Loaded {} index buckets with {} entries",
            manager.bucket_count(),
            manager.entry_count()
        );
        Ok(manager)
    }

    /// Install the entries of a bucket unless a newer version is present
    pub fn insert(&mut self, bucket: u8, version: u32, mut entries: Vec<IndexEntry>) {
        if self.buckets.get(&bucket).is_some_and(|(v, _)| *v > version) {
            return;
        }
        entries.sort_by_key(|e| e.key);
        self.buckets.insert(bucket, (version, entries));
    }

    /// Find the entry for an encoding key
    pub fn lookup(&self, key: &EncodingKey) -> Option<IndexEntry> {
        let prefix = key.first_9();
        let (_, entries) = self.buckets.get(&bucket_for_key(&prefix))?;
        entries
            .binary_search_by(|e| e.key.cmp(&prefix))
            .ok()
            .map(|i| entries[i].clone())
    }

    /// Number of loaded buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total entries across buckets
    pub fn entry_count(&self) -> usize {
        self.buckets.values().map(|(_, e)| e.len()).sum()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::writer::index_file_bytes;
    use pretty_assertions::assert_eq;

    fn ekey(first: u8) -> EncodingKey {
        let mut bytes = [0x11u8; 16];
        bytes[0] = first;
        EncodingKey::from_bytes(bytes)
    }

    #[test]
    fn test_entry_layout() {
        let entry = IndexEntry::new([0xAB; 9], 0x2C5, 0x1234_5678 & 0x3FFF_FFFF, 0x0102_0304);
        let bytes = entry.to_bytes().expect("pack");
        assert_eq!(&bytes[..9], &[0xAB; 9]);
        // 0x2C5 = 0b10_1100_0101: high byte 0xB1, low two bits 01
        assert_eq!(bytes[9], 0xB1);
        assert_eq!(bytes[10] >> 6, 0b01);
        assert_eq!(&bytes[14..], &[0x04, 0x03, 0x02, 0x01]);

        let parsed = IndexEntry::read(&mut Cursor::new(&bytes)).expect("parse");
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_bucket_for_key() {
        assert_eq!(bucket_for_key(&[0; 9]), 0);
        assert_eq!(bucket_for_key(&[0x12, 0, 0, 0, 0, 0, 0, 0, 0]), 0x03);
        assert_eq!(bucket_for_key(&[0xF0, 0x0F, 0, 0, 0, 0, 0, 0, 0xA0]), 0x0A);
        // Bytes past the ninth are ignored
        assert_eq!(
            bucket_for_key(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 0xFF]),
            bucket_for_key(&[1, 2, 3, 4, 5, 6, 7, 8, 9])
        );
    }

    #[test]
    fn test_parse_index_filename() {
        assert_eq!(parse_index_filename("0a0000001f.idx"), Some((0x0A, 0x1F)));
        assert_eq!(parse_index_filename("0a0000001f.IDX"), None);
        assert_eq!(parse_index_filename("0a00001f.idx"), None);
        assert_eq!(parse_index_filename("zz0000001f.idx"), None);
    }

    #[test]
    fn test_parse_index_and_lookup() {
        let key = ekey(0x42);
        let bucket = bucket_for_key(key.as_bytes());
        let data = index_file_bytes(
            bucket,
            &[
                IndexEntry::new(key.first_9(), 3, 4096, 100),
                IndexEntry::new(ekey(0x10).first_9(), 1, 0, 50),
            ],
        )
        .expect("write");

        let (header, entries) = parse_index(&data).expect("parse");
        assert_eq!(header.bucket, bucket);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].key < entries[1].key);

        let mut manager = IndexManager::new();
        manager.insert(bucket, 1, entries);
        let found = manager.lookup(&key).expect("present");
        assert_eq!((found.archive_id(), found.archive_offset(), found.size), (3, 4096, 100));
        assert!(manager.lookup(&ekey(0x43)).is_none());
    }

    #[test]
    fn test_newer_version_wins() {
        let key = ekey(0x42);
        let bucket = bucket_for_key(key.as_bytes());
        let mut manager = IndexManager::new();
        manager.insert(bucket, 5, vec![IndexEntry::new(key.first_9(), 9, 0, 10)]);
        manager.insert(bucket, 4, vec![IndexEntry::new(key.first_9(), 1, 0, 10)]);
        assert_eq!(manager.lookup(&key).expect("present").archive_id(), 9);
        manager.insert(bucket, 6, vec![IndexEntry::new(key.first_9(), 2, 0, 10)]);
        assert_eq!(manager.lookup(&key).expect("present").archive_id(), 2);
    }

    #[test]
    fn test_rejects_other_versions() {
        let mut data = index_file_bytes(0, &[]).expect("write");
        data[8] = 6;
        assert!(matches!(parse_index(&data), Err(StorageError::Index(_))));
        assert!(parse_index(&data[..12]).is_err());
    }
}
