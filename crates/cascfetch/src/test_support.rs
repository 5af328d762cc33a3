//! In-memory data source and table fixtures shared by unit tests

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use cascfetch_crypto::{ContentKey, EncodingKey, TactKeyStore};
use cascfetch_formats::blte::{BlteBuilder, ChunkMode};
use cascfetch_formats::encoding::{EncodingBuilder, EncodingTable};
use cascfetch_formats::root::{ContentFlags, LocaleFlags, RootBuilder, RootFile, RootVersion};

use crate::data_source::{DataSource, Location, decode_verify_commit};
use crate::error::ExtractError;
use crate::name_lookup::RootLookup;

/// Serves BLTE blobs from memory and counts how often it is asked
pub struct MemorySource {
    name: &'static str,
    blobs: HashMap<EncodingKey, Vec<u8>>,
    pub queries: Arc<AtomicUsize>,
}

impl MemorySource {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            blobs: HashMap::new(),
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with(mut self, encoding_key: EncodingKey, blte: Vec<u8>) -> Self {
        self.blobs.insert(encoding_key, blte);
        self
    }

    /// Serve `data` as a one-chunk zlib container; returns its encoding key
    pub fn serve(&mut self, data: &[u8]) -> EncodingKey {
        let blte = blte(data);
        let ekey = EncodingKey::from_data(&blte);
        self.blobs.insert(ekey, blte);
        ekey
    }
}

#[async_trait]
impl DataSource for MemorySource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn find_location(&self, encoding_key: &EncodingKey) -> Option<Location> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.blobs.get(encoding_key).map(|b| Location::Loose {
            size: b.len() as u64,
        })
    }

    async fn extract(
        &self,
        _location: &Location,
        encoding_key: &EncodingKey,
        destination: &Path,
        expected: &ContentKey,
        keys: &TactKeyStore,
    ) -> Result<(), ExtractError> {
        let blte = &self.blobs[encoding_key];
        decode_verify_commit(blte, keys, expected, destination).await
    }
}

/// One checksummed zlib chunk
pub fn blte(data: &[u8]) -> Vec<u8> {
    BlteBuilder::new()
        .chunk(data, ChunkMode::ZLib)
        .build()
        .expect("blte")
}

/// Encoding table over `(content, encoding keys)` pairs
pub fn encoding(entries: &[(&[u8], Vec<EncodingKey>)]) -> EncodingTable {
    let data = entries
        .iter()
        .fold(EncodingBuilder::new(), |builder, (content, keys)| {
            builder.entry(ContentKey::from_data(content), content.len() as u64, keys.clone())
        })
        .build();
    EncodingTable::parse(&data).expect("encoding")
}

/// Root with one enUS block mapping each file id to the digest of its content
pub fn root(files: &[(u32, &[u8])]) -> RootLookup {
    let data = files
        .iter()
        .fold(
            RootBuilder::new(RootVersion::V2).block(LocaleFlags::EN_US, ContentFlags::default()),
            |builder, (id, content)| builder.file(*id, ContentKey::from_data(content), None),
        )
        .build();
    RootLookup::new(RootFile::parse(&data).expect("root"), LocaleFlags::EN_US)
}
