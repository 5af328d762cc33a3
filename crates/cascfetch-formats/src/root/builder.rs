//! Root file builder for fixtures

use cascfetch_crypto::{ContentKey, Jenkins96};

use crate::root::flags::{ContentFlags, LocaleFlags};
use crate::root::header::{RootMagic, RootVersion};

#[derive(Debug, Clone)]
struct Block {
    locale_flags: LocaleFlags,
    content_flags: ContentFlags,
    records: Vec<(u32, ContentKey, Option<u64>)>,
}

/// Builds a decoded root file in any of the four layouts
#[derive(Debug, Clone)]
pub struct RootBuilder {
    version: RootVersion,
    magic: RootMagic,
    blocks: Vec<Block>,
}

impl RootBuilder {
    /// Empty builder; V2+ headers use `MFST`
    pub fn new(version: RootVersion) -> Self {
        Self {
            version,
            magic: RootMagic::Mfst,
            blocks: Vec::new(),
        }
    }

    /// Header magic for V2+ output
    #[must_use]
    pub fn magic(mut self, magic: RootMagic) -> Self {
        self.magic = magic;
        self
    }

    /// Start a new block; following files are added to it
    #[must_use]
    pub fn block(mut self, locale_flags: LocaleFlags, content_flags: ContentFlags) -> Self {
        self.blocks.push(Block {
            locale_flags,
            content_flags,
            records: Vec::new(),
        });
        self
    }

    /// Add a file to the current block, opening an all-locales block if none exists
    #[must_use]
    pub fn file(mut self, file_data_id: u32, content_key: ContentKey, path: Option<&str>) -> Self {
        if self.blocks.is_empty() {
            self = self.block(LocaleFlags::ALL, ContentFlags::default());
        }
        let name_hash = path.map(Jenkins96::name_hash);
        if let Some(block) = self.blocks.last_mut() {
            block.records.push((file_data_id, content_key, name_hash));
        }
        self
    }

    fn block_has_names(&self, block: &Block) -> bool {
        self.version == RootVersion::V1 || block.content_flags.has_name_hashes()
    }

    /// Serialize
    pub fn build(mut self) -> Vec<u8> {
        for block in &mut self.blocks {
            block.records.sort_by_key(|(id, _, _)| *id);
        }

        let total: usize = self.blocks.iter().map(|b| b.records.len()).sum();
        let named: usize = self
            .blocks
            .iter()
            .filter(|b| self.block_has_names(b))
            .map(|b| b.records.len())
            .sum();

        let mut out = Vec::new();
        match self.version {
            RootVersion::V1 => {}
            RootVersion::V2 => {
                out.extend_from_slice(&self.magic.to_bytes());
                out.extend_from_slice(&self.magic.write_u32(total as u32));
                out.extend_from_slice(&self.magic.write_u32(named as u32));
            }
            RootVersion::V3 | RootVersion::V4 => {
                let version = if self.version == RootVersion::V3 { 3 } else { 4 };
                out.extend_from_slice(&self.magic.to_bytes());
                for value in [24, version, total as u32, named as u32, 0] {
                    out.extend_from_slice(&self.magic.write_u32(value));
                }
            }
        }

        for block in &self.blocks {
            let count = block.records.len() as u32;
            let content = block.content_flags.0;
            out.extend_from_slice(&count.to_le_bytes());
            match self.version {
                RootVersion::V1 => {
                    out.extend_from_slice(&(content as u32).to_le_bytes());
                    out.extend_from_slice(&block.locale_flags.0.to_le_bytes());
                }
                RootVersion::V2 | RootVersion::V3 => {
                    out.extend_from_slice(&block.locale_flags.0.to_le_bytes());
                    out.extend_from_slice(&(content as u32).to_le_bytes());
                    out.extend_from_slice(&[0; 5]);
                }
                RootVersion::V4 => {
                    out.extend_from_slice(&block.locale_flags.0.to_le_bytes());
                    out.extend_from_slice(&(content as u32).to_le_bytes());
                    out.push((content >> 32) as u8);
                    out.extend_from_slice(&[0; 5]);
                }
            }

            let mut prev: i64 = -1;
            for (id, _, _) in &block.records {
                let delta = (i64::from(*id) - prev - 1) as i32;
                out.extend_from_slice(&delta.to_le_bytes());
                prev = i64::from(*id);
            }

            if self.version == RootVersion::V1 {
                for (_, ckey, hash) in &block.records {
                    out.extend_from_slice(ckey.as_bytes());
                    out.extend_from_slice(&hash.unwrap_or(0).to_le_bytes());
                }
                continue;
            }

            for (_, ckey, _) in &block.records {
                out.extend_from_slice(ckey.as_bytes());
            }
            if named > 0 && block.content_flags.has_name_hashes() {
                for (_, _, hash) in &block.records {
                    out.extend_from_slice(&hash.unwrap_or(0).to_le_bytes());
                }
            }
        }
        out
    }
}
