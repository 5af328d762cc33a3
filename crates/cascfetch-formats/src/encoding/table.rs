//! In-memory encoding table

use std::collections::HashMap;

use binrw::BinRead;
use binrw::io::Cursor;
use cascfetch_crypto::{ContentKey, EncodingKey, TactKeyStore};
use tracing::debug;

use crate::encoding::{EncodingError, EncodingHeader};
use crate::util::{key16, split_cstrings, u40_be};

const INDEX_ENTRY_SIZE: usize = 32;
const CKEY_ENTRY_MIN: usize = 1 + 5 + 16;
const EKEY_ENTRY_SIZE: usize = 16 + 4 + 5;

/// Content key and the encodings that represent it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMap {
    /// Content key
    pub content_key: ContentKey,
    /// Size of the decoded file
    pub decoded_size: u64,
    /// Encoding keys in the order stored in the table
    pub encoding_keys: Vec<EncodingKey>,
}

/// Per-encoding metadata from the encoding key pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInfo {
    /// Index into the `ESpec` string block
    pub espec_index: u32,
    /// Size of the BLTE-encoded blob
    pub encoded_size: u64,
}

/// Page index entry: first key plus MD5 of the page
#[derive(Debug, Clone, Copy, BinRead)]
struct PageIndexEntry {
    first_key: [u8; 16],
    checksum: [u8; 16],
}

/// Exact-match lookup from content key to encoding keys
#[derive(Debug, Clone)]
pub struct EncodingTable {
    header: EncodingHeader,
    especs: Vec<String>,
    content: HashMap<ContentKey, ContentMap>,
    encoded: HashMap<EncodingKey, EncodedInfo>,
    trailing_espec: Option<String>,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, section: &'static str) -> Result<&'a [u8], EncodingError> {
        let available = self.data.len() - self.pos;
        if available < len {
            return Err(EncodingError::Truncated {
                section,
                needed: len,
                available,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn page_index(
        &mut self,
        count: usize,
        section: &'static str,
    ) -> Result<Vec<PageIndexEntry>, EncodingError> {
        let bytes = self.take(count * INDEX_ENTRY_SIZE, section)?;
        let mut cursor = Cursor::new(bytes);
        (0..count)
            .map(|_| PageIndexEntry::read_le(&mut cursor).map_err(EncodingError::from))
            .collect()
    }

    fn pages(
        &mut self,
        index: &[PageIndexEntry],
        page_size: usize,
        section: &'static str,
    ) -> Result<Vec<&'a [u8]>, EncodingError> {
        index
            .iter()
            .enumerate()
            .map(|(page, entry)| {
                let bytes = self.take(page_size, section)?;
                if md5::compute(bytes).0 != entry.checksum {
                    return Err(EncodingError::ChecksumMismatch { section, page });
                }
                Ok(bytes)
            })
            .collect()
    }
}

impl EncodingTable {
    /// Parse a decoded encoding file
    pub fn parse(data: &[u8]) -> Result<Self, EncodingError> {
        let mut reader = Reader { data, pos: 0 };
        let header_bytes = reader.take(EncodingHeader::SIZE, "header")?;
        let header = EncodingHeader::read(&mut Cursor::new(header_bytes))?;
        header.validate()?;

        let especs = split_cstrings(reader.take(header.espec_block_size as usize, "espec")?);

        let ckey_index = reader.page_index(header.ckey_page_count as usize, "ckey index")?;
        let ckey_pages = reader.pages(&ckey_index, header.ckey_page_size(), "ckey")?;
        let ekey_index = reader.page_index(header.ekey_page_count as usize, "ekey index")?;
        let ekey_pages = reader.pages(&ekey_index, header.ekey_page_size(), "ekey")?;

        let trailing = &data[reader.pos..];
        let trailing_espec = split_cstrings(trailing).into_iter().next();

        let mut content = HashMap::new();
        for (page, (bytes, entry)) in ckey_pages.iter().zip(&ckey_index).enumerate() {
            parse_ckey_page(bytes, page, &entry.first_key, &mut content)?;
        }

        let mut encoded = HashMap::new();
        for bytes in &ekey_pages {
            parse_ekey_page(bytes, &mut encoded);
        }

        debug!(
            content_keys = content.len(),
            encoding_keys = encoded.len(),
            especs = especs.len(),
            "Parsed encoding table"
        );

        Ok(Self {
            header,
            especs,
            content,
            encoded,
            trailing_espec,
        })
    }

    /// Decode a BLTE-wrapped encoding file and parse it
    pub fn from_blte(data: &[u8], keys: &TactKeyStore) -> Result<Self, EncodingError> {
        let decoded = crate::blte::decode(data, keys)?;
        Self::parse(&decoded)
    }

    /// Look up the encodings of a content key
    pub fn content_map(&self, content_key: &ContentKey) -> Option<&ContentMap> {
        self.content.get(content_key)
    }

    /// Look up encoded size and `ESpec` for an encoding key
    pub fn encoded_info(&self, encoding_key: &EncodingKey) -> Option<&EncodedInfo> {
        self.encoded.get(encoding_key)
    }

    /// `ESpec` string for an encoding key
    pub fn espec_for(&self, encoding_key: &EncodingKey) -> Option<&str> {
        let info = self.encoded_info(encoding_key)?;
        self.especs.get(info.espec_index as usize).map(String::as_str)
    }

    /// Parsed header
    pub fn header(&self) -> &EncodingHeader {
        &self.header
    }

    /// `ESpec` describing the encoding file itself, if present
    pub fn trailing_espec(&self) -> Option<&str> {
        self.trailing_espec.as_deref()
    }

    /// Number of content keys
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the table has no content keys
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

fn parse_ckey_page(
    page_bytes: &[u8],
    page: usize,
    first_key: &[u8; 16],
    content: &mut HashMap<ContentKey, ContentMap>,
) -> Result<(), EncodingError> {
    let mut offset = 0;
    while page_bytes.len() - offset >= CKEY_ENTRY_MIN {
        let key_count = usize::from(page_bytes[offset]);
        if key_count == 0 {
            break;
        }

        let entry_len = CKEY_ENTRY_MIN + key_count * 16;
        if page_bytes.len() - offset < entry_len {
            return Err(EncodingError::TruncatedEntry {
                section: "ckey",
                page,
                offset,
            });
        }
        let entry = &page_bytes[offset..offset + entry_len];

        let decoded_size = u40_be(&entry[1..6]);
        let content_key = ContentKey::from_bytes(key16(&entry[6..22]));
        if offset == 0 && content_key.as_bytes() != first_key {
            return Err(EncodingError::FirstKeyMismatch { page });
        }
        let encoding_keys = entry[22..]
            .chunks_exact(16)
            .map(|key| EncodingKey::from_bytes(key16(key)))
            .collect();

        content.insert(
            content_key,
            ContentMap {
                content_key,
                decoded_size,
                encoding_keys,
            },
        );
        offset += entry_len;
    }
    Ok(())
}

fn parse_ekey_page(page_bytes: &[u8], encoded: &mut HashMap<EncodingKey, EncodedInfo>) {
    for entry in page_bytes.chunks_exact(EKEY_ENTRY_SIZE) {
        if entry[..16].iter().all(|&b| b == 0) {
            break;
        }
        let encoding_key = EncodingKey::from_bytes(key16(&entry[..16]));
        let espec_index = u32::from_be_bytes([entry[16], entry[17], entry[18], entry[19]]);
        let encoded_size = u40_be(&entry[20..25]);
        encoded.insert(
            encoding_key,
            EncodedInfo {
                espec_index,
                encoded_size,
            },
        );
    }
}
