//! Encoding file builder for fixtures

use binrw::BinWrite;
use binrw::io::Cursor;
use cascfetch_crypto::{ContentKey, EncodingKey};

use crate::encoding::EncodingHeader;

/// Builds a decoded encoding file
#[derive(Debug, Clone)]
pub struct EncodingBuilder {
    entries: Vec<(ContentKey, u64, Vec<EncodingKey>)>,
    page_size_kb: u16,
}

impl Default for EncodingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodingBuilder {
    /// Empty builder with 4 KB pages
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            page_size_kb: 4,
        }
    }

    /// Page size for both page kinds
    #[must_use]
    pub fn page_size_kb(mut self, kb: u16) -> Self {
        self.page_size_kb = kb;
        self
    }

    /// Add a content key with its encodings
    #[must_use]
    pub fn entry(
        mut self,
        content_key: ContentKey,
        decoded_size: u64,
        encoding_keys: Vec<EncodingKey>,
    ) -> Self {
        self.entries.push((content_key, decoded_size, encoding_keys));
        self
    }

    /// Serialize; every encoding key gets `ESpec` 0 and the decoded size
    pub fn build(mut self) -> Vec<u8> {
        self.entries.sort_by_key(|(ckey, _, _)| *ckey);
        let page_size = usize::from(self.page_size_kb) * 1024;

        let ckey_entries: Vec<([u8; 16], Vec<u8>)> = self
            .entries
            .iter()
            .map(|(ckey, size, ekeys)| {
                let mut bytes = vec![ekeys.len() as u8];
                bytes.extend_from_slice(&size.to_be_bytes()[3..]);
                bytes.extend_from_slice(ckey.as_bytes());
                for ekey in ekeys {
                    bytes.extend_from_slice(ekey.as_bytes());
                }
                (*ckey.as_bytes(), bytes)
            })
            .collect();

        let mut ekeys: Vec<(EncodingKey, u64)> = self
            .entries
            .iter()
            .flat_map(|(_, size, ekeys)| ekeys.iter().map(move |ekey| (*ekey, *size)))
            .collect();
        ekeys.sort_by_key(|(ekey, _)| *ekey);
        let ekey_entries: Vec<([u8; 16], Vec<u8>)> = ekeys
            .iter()
            .map(|(ekey, size)| {
                let mut bytes = ekey.as_bytes().to_vec();
                bytes.extend_from_slice(&0u32.to_be_bytes());
                bytes.extend_from_slice(&size.to_be_bytes()[3..]);
                (*ekey.as_bytes(), bytes)
            })
            .collect();

        let ckey_pages = paginate(&ckey_entries, page_size);
        let ekey_pages = paginate(&ekey_entries, page_size);
        let espec_block = b"z\0".to_vec();

        let header = EncodingHeader {
            ckey_page_size_kb: self.page_size_kb,
            ekey_page_size_kb: self.page_size_kb,
            ckey_page_count: ckey_pages.len() as u32,
            ekey_page_count: ekey_pages.len() as u32,
            espec_block_size: espec_block.len() as u32,
            ..EncodingHeader::new()
        };

        let mut cursor = Cursor::new(Vec::new());
        let _ = header.write(&mut cursor);
        let mut out = cursor.into_inner();
        out.extend_from_slice(&espec_block);
        for pages in [&ckey_pages, &ekey_pages] {
            for (first_key, page) in pages {
                out.extend_from_slice(first_key);
                out.extend_from_slice(&md5::compute(page).0);
            }
            for (_, page) in pages {
                out.extend_from_slice(page);
            }
        }
        out.extend_from_slice(b"b:{*=z}");
        out
    }
}

/// Pack entries into zero-padded pages; an empty list still yields one page
fn paginate(entries: &[([u8; 16], Vec<u8>)], page_size: usize) -> Vec<([u8; 16], Vec<u8>)> {
    let mut pages: Vec<([u8; 16], Vec<u8>)> = Vec::new();
    for (key, bytes) in entries {
        match pages.last_mut() {
            Some((_, page)) if page.len() + bytes.len() <= page_size => {
                page.extend_from_slice(bytes);
            }
            _ => pages.push((*key, bytes.clone())),
        }
    }
    if pages.is_empty() {
        pages.push(([0; 16], Vec::new()));
    }
    for (_, page) in &mut pages {
        page.resize(page_size, 0);
    }
    pages
}
