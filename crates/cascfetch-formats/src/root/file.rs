//! Parsed root file and locale-aware lookup

use std::collections::HashMap;

use cascfetch_crypto::{ContentKey, Jenkins96, TactKeyStore};
use tracing::debug;

use crate::root::error::{Result, RootError};
use crate::root::flags::{ContentFlags, LocaleFlags};
use crate::root::header::{RootHeader, RootVersion};
use crate::util::key16;

/// One record of a root block, with the flags of its block attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootEntry {
    /// File data identifier
    pub file_data_id: u32,
    /// Content key of the file
    pub content_key: ContentKey,
    /// Jenkins96 hash of the file path, when the block stores one
    pub name_hash: Option<u64>,
    /// Locales of the containing block
    pub locale_flags: LocaleFlags,
    /// Content flags of the containing block
    pub content_flags: ContentFlags,
    /// Index of the containing block in file order
    pub block: usize,
}

impl RootEntry {
    /// Ordering key among entries that all match a locale; lower wins
    fn precedence(&self) -> (bool, bool, usize) {
        (
            self.locale_flags.is_all(),
            self.content_flags.has(ContentFlags::LOW_VIOLENCE),
            self.block,
        )
    }
}

/// Root file indexed by `FileDataID` and by name hash
#[derive(Debug, Clone)]
pub struct RootFile {
    version: RootVersion,
    header: Option<RootHeader>,
    entries: Vec<RootEntry>,
    by_id: HashMap<u32, Vec<usize>>,
    by_name: HashMap<u64, Vec<usize>>,
    blocks: usize,
}

struct BlockHeader {
    count: usize,
    locale_flags: LocaleFlags,
    content_flags: ContentFlags,
}

fn u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn u64_le(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(raw)
}

fn read_block_header(version: RootVersion, bytes: &[u8]) -> BlockHeader {
    let count = u32_le(&bytes[0..4]) as usize;
    match version {
        RootVersion::V1 => BlockHeader {
            count,
            content_flags: ContentFlags(u64::from(u32_le(&bytes[4..8]))),
            locale_flags: LocaleFlags(u32_le(&bytes[8..12])),
        },
        RootVersion::V2 | RootVersion::V3 => BlockHeader {
            count,
            locale_flags: LocaleFlags(u32_le(&bytes[4..8])),
            content_flags: ContentFlags(u64::from(u32_le(&bytes[8..12]))),
        },
        RootVersion::V4 => BlockHeader {
            count,
            locale_flags: LocaleFlags(u32_le(&bytes[4..8])),
            content_flags: ContentFlags(
                u64::from(u32_le(&bytes[8..12])) | (u64::from(bytes[12]) << 32),
            ),
        },
    }
}

/// Decode `FileDataID` deltas: `id = prev + 1 + delta`, starting at `prev = -1`
fn decode_ids(deltas: &[u8], block_offset: usize) -> Result<Vec<u32>> {
    let mut prev: i64 = -1;
    deltas
        .chunks_exact(4)
        .map(|raw| {
            let delta = i64::from(u32_le(raw) as i32);
            let id = prev + 1 + delta;
            let id = u32::try_from(id).map_err(|_| RootError::InvalidDelta(block_offset))?;
            prev = i64::from(id);
            Ok(id)
        })
        .collect()
}

impl RootFile {
    /// Parse a decoded root file of any supported version
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = RootHeader::parse(data)?;
        let version = header.map_or(RootVersion::V1, |h| h.version);
        let has_named_files = header.is_none_or(|h| h.named_files > 0);

        let mut root = Self {
            version,
            header,
            entries: Vec::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            blocks: 0,
        };

        let block_header_size = version.block_header_size();
        let mut pos = header.map_or(0, |h| h.size);
        while pos < data.len() {
            let available = data.len() - pos;
            if available < block_header_size {
                return Err(RootError::TruncatedBlock {
                    offset: pos,
                    needed: block_header_size,
                    available,
                });
            }
            let block = read_block_header(version, &data[pos..]);
            let names = match version {
                RootVersion::V1 => true,
                _ => has_named_files && block.content_flags.has_name_hashes(),
            };
            let record_size = 4 + 16 + if names { 8 } else { 0 };
            let needed = block
                .count
                .checked_mul(record_size)
                .and_then(|n| n.checked_add(block_header_size))
                .unwrap_or(usize::MAX);
            if available < needed {
                return Err(RootError::TruncatedBlock {
                    offset: pos,
                    needed,
                    available,
                });
            }

            let body = &data[pos + block_header_size..pos + needed];
            root.add_block(version, &block, body, names, pos)?;
            pos += needed;
        }

        debug!(
            version = ?root.version,
            blocks = root.blocks,
            records = root.entries.len(),
            named = root.by_name.len(),
            "Parsed root file"
        );
        Ok(root)
    }

    /// Decode a BLTE-wrapped root file and parse it
    pub fn from_blte(data: &[u8], keys: &TactKeyStore) -> Result<Self> {
        let decoded = crate::blte::decode(data, keys)?;
        Self::parse(&decoded)
    }

    fn add_block(
        &mut self,
        version: RootVersion,
        block: &BlockHeader,
        body: &[u8],
        names: bool,
        offset: usize,
    ) -> Result<()> {
        let count = block.count;
        let (deltas, rest) = body.split_at(count * 4);
        let ids = decode_ids(deltas, offset)?;

        for (i, file_data_id) in ids.into_iter().enumerate() {
            let (content_key, name_hash) = if version == RootVersion::V1 {
                let record = &rest[i * 24..(i + 1) * 24];
                (key16(&record[..16]), Some(u64_le(&record[16..])))
            } else {
                let ckey = key16(&rest[i * 16..]);
                let hash = names.then(|| u64_le(&rest[count * 16 + i * 8..]));
                (ckey, hash)
            };

            let index = self.entries.len();
            self.by_id.entry(file_data_id).or_default().push(index);
            if let Some(hash) = name_hash {
                self.by_name.entry(hash).or_default().push(index);
            }
            self.entries.push(RootEntry {
                file_data_id,
                content_key: ContentKey::from_bytes(content_key),
                name_hash,
                locale_flags: block.locale_flags,
                content_flags: block.content_flags,
                block: self.blocks,
            });
        }
        self.blocks += 1;
        Ok(())
    }

    fn best_match(&self, candidates: Option<&Vec<usize>>, locale: LocaleFlags) -> Option<&RootEntry> {
        candidates?
            .iter()
            .map(|&i| &self.entries[i])
            .filter(|entry| entry.locale_flags.matches(locale))
            .min_by_key(|entry| entry.precedence())
    }

    /// Best entry for a `FileDataID` in the requested locale
    ///
    /// An entry tagged with the specific locale beats an all-locales entry,
    /// a regular entry beats a low-violence one, then the earlier block wins.
    pub fn find_by_id(&self, file_data_id: u32, locale: LocaleFlags) -> Option<&RootEntry> {
        self.best_match(self.by_id.get(&file_data_id), locale)
    }

    /// Best entry for a precomputed name hash
    pub fn find_by_name_hash(&self, name_hash: u64, locale: LocaleFlags) -> Option<&RootEntry> {
        self.best_match(self.by_name.get(&name_hash), locale)
    }

    /// Best entry for a file path; separators and case are normalised
    pub fn find_by_path(&self, path: &str, locale: LocaleFlags) -> Option<&RootEntry> {
        self.find_by_name_hash(Jenkins96::name_hash(path), locale)
    }

    /// All entries, in file order
    pub fn entries(&self) -> &[RootEntry] {
        &self.entries
    }

    /// Detected layout
    pub fn version(&self) -> RootVersion {
        self.version
    }

    /// Header, absent for V1
    pub fn header(&self) -> Option<&RootHeader> {
        self.header.as_ref()
    }

    /// Number of blocks
    pub fn block_count(&self) -> usize {
        self.blocks
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::root::RootBuilder;
    use pretty_assertions::assert_eq;

    fn ckey(n: u8) -> ContentKey {
        ContentKey::from_bytes([n; 16])
    }

    fn sample(version: RootVersion) -> Vec<u8> {
        RootBuilder::new(version)
            .block(LocaleFlags::ALL, ContentFlags::default())
            .file(100, ckey(1), Some("Interface/Icons/Test.blp"))
            .file(101, ckey(2), None)
            .file(205, ckey(3), Some("world/maps/map.wdt"))
            .block(LocaleFlags::EN_US, ContentFlags::default())
            .file(100, ckey(4), Some("Interface/Icons/Test.blp"))
            .build()
    }

    #[test]
    fn test_parse_all_versions() {
        for version in [
            RootVersion::V1,
            RootVersion::V2,
            RootVersion::V3,
            RootVersion::V4,
        ] {
            let root = RootFile::parse(&sample(version)).expect("parse");
            assert_eq!(root.version(), version);
            assert_eq!(root.block_count(), 2);
            assert_eq!(root.entries().len(), 4);
            assert_eq!(
                root.find_by_id(205, LocaleFlags::DE_DE).expect("205").content_key,
                ckey(3)
            );
            assert_eq!(
                root.find_by_path("WORLD\\MAPS\\MAP.WDT", LocaleFlags::DE_DE)
                    .expect("by path")
                    .file_data_id,
                205
            );
        }
    }

    #[test]
    fn test_specific_locale_beats_all() {
        let root = RootFile::parse(&sample(RootVersion::V4)).expect("parse");
        assert_eq!(
            root.find_by_id(100, LocaleFlags::EN_US).expect("enUS").content_key,
            ckey(4)
        );
        assert_eq!(
            root.find_by_id(100, LocaleFlags::FR_FR).expect("frFR").content_key,
            ckey(1)
        );
        assert_eq!(
            root.find_by_path("interface/icons/test.blp", LocaleFlags::EN_US)
                .expect("path")
                .content_key,
            ckey(4)
        );
    }

    #[test]
    fn test_low_violence_loses() {
        let data = RootBuilder::new(RootVersion::V2)
            .block(LocaleFlags::EN_US, ContentFlags(ContentFlags::LOW_VIOLENCE))
            .file(7, ckey(1), None)
            .block(LocaleFlags::EN_US, ContentFlags::default())
            .file(7, ckey(2), None)
            .build();
        let root = RootFile::parse(&data).expect("parse");
        assert_eq!(
            root.find_by_id(7, LocaleFlags::EN_US).expect("7").content_key,
            ckey(2)
        );
    }

    #[test]
    fn test_locale_without_match() {
        let data = RootBuilder::new(RootVersion::V3)
            .block(LocaleFlags::DE_DE, ContentFlags::default())
            .file(9, ckey(9), None)
            .build();
        let root = RootFile::parse(&data).expect("parse");
        assert!(root.find_by_id(9, LocaleFlags::EN_US).is_none());
        assert!(root.find_by_id(10, LocaleFlags::DE_DE).is_none());
    }

    #[test]
    fn test_no_name_hash_blocks() {
        let data = RootBuilder::new(RootVersion::V2)
            .block(LocaleFlags::ALL, ContentFlags(ContentFlags::NO_NAME_HASH))
            .file(1, ckey(1), Some("ignored.txt"))
            .block(LocaleFlags::ALL, ContentFlags::default())
            .file(2, ckey(2), Some("kept.txt"))
            .build();
        let root = RootFile::parse(&data).expect("parse");
        assert_eq!(root.entries()[0].name_hash, None);
        assert!(root.find_by_path("ignored.txt", LocaleFlags::EN_US).is_none());
        assert!(root.find_by_path("KEPT.TXT", LocaleFlags::EN_US).is_some());
    }

    #[test]
    fn test_delta_decoding() {
        let ids = decode_ids(
            &[0u32, 0, 4, 0xFFFF_FFFE]
                .iter()
                .flat_map(|d| d.to_le_bytes())
                .collect::<Vec<_>>(),
            0,
        )
        .expect("ids");
        assert_eq!(ids, vec![0, 1, 6, 5]);
    }

    #[test]
    fn test_truncated_block() {
        let data = sample(RootVersion::V2);
        assert!(matches!(
            RootFile::parse(&data[..data.len() - 3]),
            Err(RootError::TruncatedBlock { .. })
        ));
    }
}
