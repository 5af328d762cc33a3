//! Archive index builder for fixtures

use cascfetch_crypto::EncodingKey;

use crate::archive::index::IndexFooter;

/// Builds a CDN archive index with 4 KB pages and 16-byte keys
#[derive(Debug, Clone)]
pub struct ArchiveIndexBuilder {
    entries: Vec<(EncodingKey, u32, u64)>,
    offset_bytes: u8,
}

impl Default for ArchiveIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveIndexBuilder {
    /// Empty builder with 4-byte offsets
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            offset_bytes: 4,
        }
    }

    /// Offset field width; 0 builds a loose-file index
    #[must_use]
    pub fn offset_bytes(mut self, width: u8) -> Self {
        self.offset_bytes = width;
        self
    }

    /// Add a record
    #[must_use]
    pub fn entry(mut self, encoding_key: EncodingKey, size: u32, offset: u64) -> Self {
        self.entries.push((encoding_key, size, offset));
        self
    }

    /// Serialize
    pub fn build(mut self) -> Vec<u8> {
        self.entries.sort_by_key(|(key, _, _)| *key);
        let mut footer = IndexFooter::new(self.entries.len() as u32, self.offset_bytes);
        let page_size = footer.page_size();
        let per_page = page_size / footer.record_size();
        let width = usize::from(self.offset_bytes);

        let mut out = Vec::new();
        let mut toc_keys = Vec::new();
        let mut toc_hashes = Vec::new();
        for page in self.entries.chunks(per_page) {
            let mut bytes = Vec::with_capacity(page_size);
            for (key, size, offset) in page {
                bytes.extend_from_slice(key.as_bytes());
                bytes.extend_from_slice(&size.to_be_bytes());
                bytes.extend_from_slice(&offset.to_be_bytes()[8 - width..]);
            }
            bytes.resize(page_size, 0);
            if let Some((last, _, _)) = page.last() {
                toc_keys.extend_from_slice(last.as_bytes());
            }
            toc_hashes.extend_from_slice(&md5::compute(&bytes).0[..8]);
            out.extend_from_slice(&bytes);
        }

        let mut toc = toc_keys;
        toc.extend_from_slice(&toc_hashes);
        footer.toc_hash.copy_from_slice(&md5::compute(&toc).0[..8]);
        out.extend_from_slice(&toc);
        out.extend_from_slice(&footer.to_bytes());
        out
    }
}
