//! Install manifest parsing and name lookup

use std::collections::HashMap;

use cascfetch_crypto::{ContentKey, TactKeyStore};
use tracing::debug;

use crate::install::error::{InstallError, Result};
use crate::util::{key16, read_cstring};

const HEADER_SIZE: usize = 10;

/// Tag with one membership bit per manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTag {
    /// Tag name, e.g. `Windows` or `enUS`
    pub name: String,
    /// Raw tag type
    pub tag_type: u16,
    /// Membership bits, most significant bit first
    pub mask: Vec<u8>,
}

impl InstallTag {
    /// Whether the entry at `index` carries this tag
    pub fn contains(&self, index: usize) -> bool {
        self.mask
            .get(index / 8)
            .is_some_and(|byte| byte & (0x80 >> (index % 8)) != 0)
    }
}

/// File listed in the install manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallEntry {
    /// Path as stored in the manifest
    pub path: String,
    /// Content key
    pub content_key: ContentKey,
    /// Decoded size
    pub size: u32,
}

/// Install manifest keyed by normalised file name
#[derive(Debug, Clone)]
pub struct InstallManifest {
    tags: Vec<InstallTag>,
    entries: Vec<InstallEntry>,
    by_name: HashMap<String, usize>,
}

/// Upper-case and use `\` separators
pub fn normalize_name(name: &str) -> String {
    name.replace('/', "\\").to_ascii_uppercase()
}

fn truncated(section: &'static str, needed: usize, available: usize) -> InstallError {
    InstallError::Truncated {
        section,
        needed,
        available,
    }
}

impl InstallManifest {
    /// Parse a decoded install manifest
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(truncated("header", HEADER_SIZE, data.len()));
        }
        let magic = [data[0], data[1]];
        if magic != *b"IN" {
            return Err(InstallError::InvalidMagic(magic));
        }
        if data[2] != 1 {
            return Err(InstallError::UnsupportedVersion(data[2]));
        }
        if data[3] != 16 {
            return Err(InstallError::InvalidCKeyLength(data[3]));
        }
        let tag_count = usize::from(u16::from_be_bytes([data[4], data[5]]));
        let entry_count = u32::from_be_bytes([data[6], data[7], data[8], data[9]]) as usize;
        let mask_len = entry_count.div_ceil(8);

        let mut pos = HEADER_SIZE;
        let mut tags = Vec::with_capacity(tag_count);
        for _ in 0..tag_count {
            let (name, next) = read_cstring(data, pos).ok_or(
                InstallError::UnterminatedString {
                    section: "tag",
                    offset: pos,
                },
            )?;
            let needed = 2 + mask_len;
            let available = data.len() - next;
            if available < needed {
                return Err(truncated("tag", needed, available));
            }
            tags.push(InstallTag {
                name,
                tag_type: u16::from_be_bytes([data[next], data[next + 1]]),
                mask: data[next + 2..next + needed].to_vec(),
            });
            pos = next + needed;
        }

        let mut entries = Vec::with_capacity(entry_count);
        let mut by_name = HashMap::with_capacity(entry_count);
        for index in 0..entry_count {
            let (path, next) = read_cstring(data, pos).ok_or(
                InstallError::UnterminatedString {
                    section: "entry",
                    offset: pos,
                },
            )?;
            let available = data.len() - next;
            if available < 20 {
                return Err(truncated("entry", 20, available));
            }
            let content_key = ContentKey::from_bytes(key16(&data[next..next + 16]));
            let size = u32::from_be_bytes([
                data[next + 16],
                data[next + 17],
                data[next + 18],
                data[next + 19],
            ]);
            by_name.entry(normalize_name(&path)).or_insert(index);
            entries.push(InstallEntry {
                path,
                content_key,
                size,
            });
            pos = next + 20;
        }

        debug!(tags = tags.len(), entries = entries.len(), "Parsed install manifest");
        Ok(Self {
            tags,
            entries,
            by_name,
        })
    }

    /// Decode a BLTE-wrapped install manifest and parse it
    pub fn from_blte(data: &[u8], keys: &TactKeyStore) -> Result<Self> {
        let decoded = crate::blte::decode(data, keys)?;
        Self::parse(&decoded)
    }

    /// Look up an entry by name; case and separator style are ignored
    pub fn find(&self, name: &str) -> Option<&InstallEntry> {
        self.by_name
            .get(&normalize_name(name))
            .map(|&index| &self.entries[index])
    }

    /// Names of the tags attached to the entry with the given name
    pub fn tags_for(&self, name: &str) -> Vec<&str> {
        let Some(&index) = self.by_name.get(&normalize_name(name)) else {
            return Vec::new();
        };
        self.tags
            .iter()
            .filter(|tag| tag.contains(index))
            .map(|tag| tag.name.as_str())
            .collect()
    }

    /// All entries, in manifest order
    pub fn entries(&self) -> &[InstallEntry] {
        &self.entries
    }

    /// All tags, in manifest order
    pub fn tags(&self) -> &[InstallTag] {
        &self.tags
    }
}
