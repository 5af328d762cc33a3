//! CDN archive index (`.index`) parsing
//!
//! An index is a run of fixed-size pages holding sorted
//! `(key, size, offset)` records, a table of contents with the last key and
//! a partial MD5 of every page, and a footer describing the field widths.

use cascfetch_crypto::EncodingKey;
use tracing::debug;

use crate::archive::error::{ArchiveError, ArchiveResult};

/// Footer size with the usual 8-byte checksums
pub const FOOTER_SIZE: usize = 28;

/// Index footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFooter {
    /// Partial MD5 of the table of contents
    pub toc_hash: [u8; 8],
    /// Format version (1)
    pub version: u8,
    /// Page size in KB
    pub page_size_kb: u8,
    /// Width of the offset field; 0 for loose-file indexes, 6 for archive groups
    pub offset_bytes: u8,
    /// Width of the size field
    pub size_bytes: u8,
    /// Stored key length
    pub ekey_length: u8,
    /// Checksum length used in the TOC and footer
    pub hash_bytes: u8,
    /// Number of records
    pub element_count: u32,
    /// Partial MD5 of the footer fields
    pub footer_hash: [u8; 8],
}

impl IndexFooter {
    /// Footer for a regular archive index
    pub fn new(element_count: u32, offset_bytes: u8) -> Self {
        let mut footer = Self {
            toc_hash: [0; 8],
            version: 1,
            page_size_kb: 4,
            offset_bytes,
            size_bytes: 4,
            ekey_length: 16,
            hash_bytes: 8,
            element_count,
            footer_hash: [0; 8],
        };
        footer.footer_hash = footer.compute_hash();
        footer
    }

    /// MD5 over the fields from `version` on, with the checksum zeroed
    pub fn compute_hash(&self) -> [u8; 8] {
        let mut data = [0u8; 20];
        data[..12].copy_from_slice(&self.field_bytes());
        let digest = md5::compute(data).0;
        let mut hash = [0u8; 8];
        hash.copy_from_slice(&digest[..8]);
        hash
    }

    fn field_bytes(&self) -> [u8; 12] {
        let count = self.element_count.to_le_bytes();
        [
            self.version,
            0,
            0,
            self.page_size_kb,
            self.offset_bytes,
            self.size_bytes,
            self.ekey_length,
            self.hash_bytes,
            count[0],
            count[1],
            count[2],
            count[3],
        ]
    }

    /// Serialized footer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FOOTER_SIZE);
        out.extend_from_slice(&self.toc_hash);
        out.extend_from_slice(&self.field_bytes());
        out.extend_from_slice(&self.footer_hash);
        out
    }

    fn parse(data: &[u8]) -> ArchiveResult<Self> {
        if data.len() < FOOTER_SIZE {
            return Err(ArchiveError::TooSmall(data.len()));
        }
        let raw = &data[data.len() - FOOTER_SIZE..];
        let mut toc_hash = [0u8; 8];
        toc_hash.copy_from_slice(&raw[..8]);
        let mut footer_hash = [0u8; 8];
        footer_hash.copy_from_slice(&raw[20..28]);

        let footer = Self {
            toc_hash,
            version: raw[8],
            page_size_kb: raw[11],
            offset_bytes: raw[12],
            size_bytes: raw[13],
            ekey_length: raw[14],
            hash_bytes: raw[15],
            element_count: u32::from_le_bytes([raw[16], raw[17], raw[18], raw[19]]),
            footer_hash,
        };

        if footer.version != 1 {
            return Err(ArchiveError::UnsupportedVersion(footer.version));
        }
        if footer.hash_bytes != 8 {
            return Err(ArchiveError::InvalidFooter(format!(
                "checksum size {}",
                footer.hash_bytes
            )));
        }
        let expected = footer.compute_hash();
        if expected != footer.footer_hash {
            return Err(ArchiveError::FooterChecksum {
                expected,
                actual: footer.footer_hash,
            });
        }
        if ![0, 4, 5, 6].contains(&footer.offset_bytes) {
            return Err(ArchiveError::InvalidFooter(format!(
                "offset size {}",
                footer.offset_bytes
            )));
        }
        if footer.size_bytes != 4 {
            return Err(ArchiveError::InvalidFooter(format!(
                "size field {}",
                footer.size_bytes
            )));
        }
        if !(9..=16).contains(&footer.ekey_length) {
            return Err(ArchiveError::InvalidFooter(format!(
                "key length {}",
                footer.ekey_length
            )));
        }
        if footer.page_size_kb == 0 {
            return Err(ArchiveError::InvalidFooter("page size 0".to_string()));
        }
        Ok(footer)
    }

    /// Bytes per record
    pub fn record_size(&self) -> usize {
        usize::from(self.ekey_length) + usize::from(self.size_bytes) + usize::from(self.offset_bytes)
    }

    /// Bytes per page
    pub fn page_size(&self) -> usize {
        usize::from(self.page_size_kb) * 1024
    }
}

/// One record of an archive index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Stored key, `ekey_length` bytes
    pub key: Vec<u8>,
    /// Size of the BLTE blob
    pub size: u32,
    /// Offset in the archive; 0 for loose-file indexes
    pub offset: u64,
    /// Archive number within a group (6-byte offsets only)
    pub archive_index: Option<u16>,
}

impl IndexEntry {
    fn parse(raw: &[u8], footer: &IndexFooter) -> Self {
        let key_len = usize::from(footer.ekey_length);
        let key = raw[..key_len].to_vec();
        let size = u32::from_be_bytes([
            raw[key_len],
            raw[key_len + 1],
            raw[key_len + 2],
            raw[key_len + 3],
        ]);
        let off = &raw[key_len + 4..];
        let (offset, archive_index) = match footer.offset_bytes {
            6 => (
                u64::from(u32::from_be_bytes([off[2], off[3], off[4], off[5]])),
                Some(u16::from_be_bytes([off[0], off[1]])),
            ),
            n => (
                off[..usize::from(n)]
                    .iter()
                    .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
                None,
            ),
        };
        Self {
            key,
            size,
            offset,
            archive_index,
        }
    }
}

/// Parsed archive index
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    footer: IndexFooter,
    entries: Vec<IndexEntry>,
}

impl ArchiveIndex {
    /// Parse a complete `.index` file
    pub fn parse(data: &[u8]) -> ArchiveResult<Self> {
        let footer = IndexFooter::parse(data)?;
        let record_size = footer.record_size();
        let page_size = footer.page_size();
        let per_page = page_size / record_size;
        let declared = footer.element_count as usize;
        let pages = declared.div_ceil(per_page.max(1));

        let toc_size = pages * (usize::from(footer.ekey_length) + usize::from(footer.hash_bytes));
        let body_len = data.len() - FOOTER_SIZE;
        let Some(page_region) = body_len.checked_sub(toc_size) else {
            return Err(ArchiveError::TooSmall(data.len()));
        };

        let mut entries = Vec::with_capacity(declared);
        for page in data[..page_region].chunks(page_size) {
            for raw in page.chunks_exact(record_size) {
                if entries.len() == declared {
                    break;
                }
                if raw.iter().all(|&b| b == 0) {
                    break;
                }
                entries.push(IndexEntry::parse(raw, &footer));
            }
        }

        if entries.len() != declared {
            return Err(ArchiveError::EntryCountMismatch {
                declared: footer.element_count,
                found: entries.len(),
            });
        }
        if !entries.windows(2).all(|w| w[0].key <= w[1].key) {
            return Err(ArchiveError::UnsortedEntries);
        }

        debug!(
            entries = entries.len(),
            pages,
            offset_bytes = footer.offset_bytes,
            "Parsed archive index"
        );
        Ok(Self { footer, entries })
    }

    /// Find the record for an encoding key
    pub fn find(&self, encoding_key: &EncodingKey) -> Option<&IndexEntry> {
        let len = usize::from(self.footer.ekey_length);
        let probe = &encoding_key.as_bytes()[..len];
        self.entries
            .binary_search_by(|entry| entry.key.as_slice().cmp(probe))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Footer
    pub fn footer(&self) -> &IndexFooter {
        &self.footer
    }

    /// Records, sorted by key
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Whether this index lists loose files rather than archive contents
    pub fn is_loose_file_index(&self) -> bool {
        self.footer.offset_bytes == 0
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no records
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::archive::ArchiveIndexBuilder;
    use pretty_assertions::assert_eq;

    fn ekey(n: u16) -> EncodingKey {
        let mut bytes = [0x11u8; 16];
        bytes[..2].copy_from_slice(&n.to_be_bytes());
        EncodingKey::from_bytes(bytes)
    }

    #[test]
    fn test_find_entries_across_pages() {
        let mut builder = ArchiveIndexBuilder::new();
        for n in (1..=400u16).rev() {
            builder = builder.entry(ekey(n), u32::from(n) * 10, u64::from(n) * 1000);
        }
        let data = builder.build();
        let index = ArchiveIndex::parse(&data).expect("parse");

        assert_eq!(index.len(), 400);
        let entry = index.find(&ekey(321)).expect("present");
        assert_eq!(entry.size, 3210);
        assert_eq!(entry.offset, 321_000);
        assert!(index.find(&ekey(999)).is_none());
        assert!(!index.is_loose_file_index());
    }

    #[test]
    fn test_loose_file_index() {
        let data = ArchiveIndexBuilder::new()
            .offset_bytes(0)
            .entry(ekey(5), 77, 0)
            .build();
        let index = ArchiveIndex::parse(&data).expect("parse");
        assert!(index.is_loose_file_index());
        assert_eq!(index.find(&ekey(5)).expect("present").size, 77);
    }

    #[test]
    fn test_footer_checksum() {
        let mut data = ArchiveIndexBuilder::new().entry(ekey(1), 1, 0).build();
        let count_pos = data.len() - 12;
        data[count_pos] ^= 0x01;
        assert!(matches!(
            ArchiveIndex::parse(&data),
            Err(ArchiveError::FooterChecksum { .. })
        ));
        assert!(matches!(
            ArchiveIndex::parse(&data[..10]),
            Err(ArchiveError::TooSmall(10))
        ));
    }

    #[test]
    fn test_footer_round_trip_fields() {
        let footer = IndexFooter::new(3, 4);
        let bytes = footer.to_bytes();
        assert_eq!(bytes.len(), FOOTER_SIZE);
        assert_eq!(IndexFooter::parse(&bytes).expect("parse"), footer);
    }
}
