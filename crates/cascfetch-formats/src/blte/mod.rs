//! BLTE (Block Table Encoded) container
//!
//! Every blob served by a CDN or stored in a local archive is a BLTE
//! container: a `BLTE` magic, an optional chunk table, and one or more
//! chunks each tagged with a mode byte (`N`, `Z`, `4`, `E`).
//!
//! Decoding is all-or-nothing. Every chunk is checked against its table
//! checksum before its decoded bytes are kept, and any failure discards
//! the whole result.
//!
//! ```
//! use cascfetch_crypto::TactKeyStore;
//! use cascfetch_formats::blte;
//!
//! let data = b"BLTE\0\0\0\0Nhello";
//! assert_eq!(blte::decode(data, &TactKeyStore::empty()).unwrap(), b"hello");
//! ```

#[cfg(any(test, feature = "builders"))]
mod builder;
mod chunk;
mod compression;
mod encryption;
mod error;
mod header;

#[cfg(any(test, feature = "builders"))]
pub use builder::BlteBuilder;
pub use chunk::{ChunkMode, MAX_NESTING_DEPTH, decode_chunk};
pub use compression::MAX_DECOMPRESSION_SIZE;
pub use encryption::{EncryptedHeader, EncryptionType, decrypt_payload};
pub use error::{BlteError, BlteResult};
pub use header::{BLTE_MAGIC, BlteHeader, ChunkInfo, HeaderFlags};

use cascfetch_crypto::TactKeyStore;

/// A parsed BLTE container borrowing its chunk bytes
#[derive(Debug, Clone)]
pub struct BlteFile<'a> {
    /// Parsed header
    pub header: BlteHeader,
    chunks: Vec<&'a [u8]>,
}

impl<'a> BlteFile<'a> {
    /// Parse the header and split the payload into chunks
    pub fn parse(data: &'a [u8]) -> BlteResult<Self> {
        let header = BlteHeader::parse(data)?;
        let body = &data[header.data_offset()..];

        if header.is_single_chunk() {
            if body.is_empty() {
                return Err(BlteError::EmptyChunk(0));
            }
            return Ok(Self {
                header,
                chunks: vec![body],
            });
        }

        let declared: u64 = header
            .chunks
            .iter()
            .map(|info| u64::from(info.compressed_size))
            .sum();
        if declared != body.len() as u64 {
            return Err(BlteError::ChunkSizeMismatch {
                declared,
                available: body.len(),
            });
        }

        let total: u64 = header
            .chunks
            .iter()
            .map(|info| u64::from(info.decompressed_size))
            .sum();
        if total > MAX_DECOMPRESSION_SIZE as u64 {
            return Err(BlteError::SizeLimitExceeded(total));
        }

        let mut chunks = Vec::with_capacity(header.chunks.len());
        let mut offset = 0usize;
        for (index, info) in header.chunks.iter().enumerate() {
            let size = info.compressed_size as usize;
            if size == 0 {
                return Err(BlteError::EmptyChunk(index));
            }
            chunks.push(&body[offset..offset + size]);
            offset += size;
        }

        Ok(Self { header, chunks })
    }

    /// Number of chunks
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Decode every chunk in order and concatenate the results
    pub fn decode(&self, keys: &TactKeyStore) -> BlteResult<Vec<u8>> {
        let capacity = self
            .header
            .chunks
            .iter()
            .map(|info| info.decompressed_size as usize)
            .sum();
        let mut out = Vec::with_capacity(capacity);

        for (index, chunk) in self.chunks.iter().enumerate() {
            let info = self.header.chunks.get(index);

            if let Some(info) = info {
                verify_checksum(index, &info.checksum, chunk)?;
            }

            let decoded = decode_chunk(
                chunk,
                index,
                keys,
                info.map(|info| info.decompressed_size as usize),
            )?;

            if let Some(expected) = info.and_then(|info| info.decompressed_checksum) {
                verify_checksum(index, &expected, &decoded)?;
            }

            if out.len() + decoded.len() > MAX_DECOMPRESSION_SIZE {
                return Err(BlteError::SizeLimitExceeded(
                    (out.len() + decoded.len()) as u64,
                ));
            }
            out.extend_from_slice(&decoded);
        }

        Ok(out)
    }
}

/// Decode a complete BLTE blob
pub fn decode(data: &[u8], keys: &TactKeyStore) -> BlteResult<Vec<u8>> {
    BlteFile::parse(data)?.decode(keys)
}

/// An all-zero checksum means the producer did not record one
fn verify_checksum(index: usize, expected: &[u8; 16], data: &[u8]) -> BlteResult<()> {
    if expected.iter().all(|&b| b == 0) {
        return Ok(());
    }
    let actual = md5::compute(data).0;
    if &actual != expected {
        return Err(BlteError::ChecksumMismatch {
            chunk: index,
            expected: hex::encode(expected),
            actual: hex::encode(actual),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use cascfetch_crypto::TactKey;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const KEY_NAME: u64 = 0xFA50_5078_126A_CB3E;

    fn keys() -> TactKeyStore {
        let mut keys = TactKeyStore::empty();
        keys.add(TactKey::new(KEY_NAME, [0x11; 16]));
        keys
    }

    #[test]
    fn test_single_chunk_without_table() {
        let data = BlteBuilder::single_chunk(b"single", ChunkMode::ZLib).expect("build");
        assert_eq!(&data[4..8], &[0, 0, 0, 0]);
        assert_eq!(decode(&data, &keys()).expect("decode"), b"single");
    }

    #[test]
    fn test_multi_chunk_concatenates_in_order() {
        let data = BlteBuilder::new()
            .chunk(b"first-", ChunkMode::None)
            .chunk(b"second-", ChunkMode::ZLib)
            .chunk(b"third", ChunkMode::Lz4)
            .build()
            .expect("build");
        let file = BlteFile::parse(&data).expect("parse");
        assert_eq!(file.chunk_count(), 3);
        assert_eq!(file.decode(&keys()).expect("decode"), b"first-second-third");
    }

    #[test]
    fn test_extended_table_checks_decoded_md5() {
        let data = BlteBuilder::new()
            .extended()
            .chunk(b"abc", ChunkMode::None)
            .build()
            .expect("build");
        assert_eq!(decode(&data, &keys()).expect("decode"), b"abc");

        // Corrupt only the decoded checksum in the table
        let mut corrupted = data.clone();
        corrupted[12 + 24] ^= 0xFF;
        assert!(matches!(
            decode(&corrupted, &keys()),
            Err(BlteError::ChecksumMismatch { chunk: 0, .. })
        ));
    }

    #[test]
    fn test_encrypted_chunk_between_plain_chunks() {
        let data = BlteBuilder::new()
            .chunk(b"head ", ChunkMode::None)
            .encrypted_chunk(b"hidden ", ChunkMode::ZLib, KEY_NAME, [0x11; 16], [9, 8, 7, 6])
            .chunk(b"tail", ChunkMode::None)
            .build()
            .expect("build");
        assert_eq!(decode(&data, &keys()).expect("decode"), b"head hidden tail");
    }

    #[test]
    fn test_missing_key_fails_whole_decode() {
        let data = BlteBuilder::new()
            .chunk(b"head ", ChunkMode::None)
            .encrypted_chunk(b"hidden", ChunkMode::None, KEY_NAME, [0x11; 16], [1, 2, 3, 4])
            .build()
            .expect("build");
        assert!(matches!(
            decode(&data, &TactKeyStore::empty()),
            Err(BlteError::KeyNotFound(KEY_NAME))
        ));
    }

    #[test]
    fn test_payload_length_must_match_table() {
        let mut data = BlteBuilder::new()
            .chunk(b"abc", ChunkMode::None)
            .build()
            .expect("build");
        data.push(0);
        assert!(matches!(
            decode(&data, &keys()),
            Err(BlteError::ChunkSizeMismatch { declared: 4, available: 5 })
        ));
        data.truncate(data.len() - 2);
        assert!(matches!(
            decode(&data, &keys()),
            Err(BlteError::ChunkSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_single_chunk() {
        assert!(matches!(
            decode(b"BLTE\0\0\0\0", &keys()),
            Err(BlteError::EmptyChunk(0))
        ));
    }

    proptest! {
        #[test]
        fn prop_decode_is_deterministic(data in proptest::collection::vec(any::<u8>(), 1..2048)) {
            let blob = BlteBuilder::new()
                .chunk(&data[..data.len() / 2], ChunkMode::ZLib)
                .chunk(&data[data.len() / 2..], ChunkMode::None)
                .build()
                .unwrap();
            let first = decode(&blob, &keys()).unwrap();
            let second = decode(&blob, &keys()).unwrap();
            prop_assert_eq!(&first, &data);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_corrupt_chunk_byte_is_detected(
            data in proptest::collection::vec(any::<u8>(), 1..512),
            position in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut blob = BlteBuilder::new()
                .chunk(&data, ChunkMode::None)
                .build()
                .unwrap();
            let start = BlteHeader::parse(&blob).unwrap().data_offset();
            let target = start + position.index(blob.len() - start);
            blob[target] ^= flip;
            prop_assert!(decode(&blob, &keys()).is_err());
        }
    }
}
