//! Chunk modes and per-chunk decoding

use cascfetch_crypto::TactKeyStore;

use super::compression::{inflate, lz4_decompress};
use super::encryption::decrypt_payload;
use super::error::{BlteError, BlteResult};

/// Deepest chain of encrypted chunks wrapping one another
pub const MAX_NESTING_DEPTH: usize = 4;

/// BLTE chunk modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkMode {
    /// Stored as-is (`N`)
    None = b'N',
    /// zlib (`Z`)
    ZLib = b'Z',
    /// LZ4 with a size prefix (`4`)
    Lz4 = b'4',
    /// Encrypted inner chunk (`E`)
    Encrypted = b'E',
    /// Recursive BLTE frame (`F`), recognised but not supported
    Frame = b'F',
}

impl ChunkMode {
    /// Parse a mode byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'N' => Some(Self::None),
            b'Z' => Some(Self::ZLib),
            b'4' => Some(Self::Lz4),
            b'E' => Some(Self::Encrypted),
            b'F' => Some(Self::Frame),
            _ => None,
        }
    }

    /// Byte representation
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Decode one chunk, mode byte included
///
/// `expected_size` comes from the chunk table when there is one. Encrypted
/// chunks decrypt to another chunk which is decoded the same way, so the
/// size check applies to the innermost result.
pub fn decode_chunk(
    chunk: &[u8],
    index: usize,
    keys: &TactKeyStore,
    expected_size: Option<usize>,
) -> BlteResult<Vec<u8>> {
    decode_nested(chunk, index, keys, expected_size, 0)
}

fn decode_nested(
    chunk: &[u8],
    index: usize,
    keys: &TactKeyStore,
    expected_size: Option<usize>,
    depth: usize,
) -> BlteResult<Vec<u8>> {
    let (&mode_byte, payload) = chunk.split_first().ok_or(BlteError::EmptyChunk(index))?;
    let mode = ChunkMode::from_byte(mode_byte).ok_or(BlteError::UnknownChunkMode(mode_byte))?;

    let decoded = match mode {
        ChunkMode::None => payload.to_vec(),
        ChunkMode::ZLib => inflate(payload)?,
        ChunkMode::Lz4 => lz4_decompress(payload)?,
        ChunkMode::Encrypted => {
            if depth >= MAX_NESTING_DEPTH {
                return Err(BlteError::NestingTooDeep(MAX_NESTING_DEPTH));
            }
            let inner = decrypt_payload(payload, keys, index)?;
            return decode_nested(&inner, index, keys, expected_size, depth + 1);
        }
        ChunkMode::Frame => return Err(BlteError::UnsupportedChunkMode(mode_byte)),
    };

    if let Some(expected) = expected_size {
        if decoded.len() != expected {
            return Err(BlteError::DecodedSizeMismatch {
                chunk: index,
                expected,
                actual: decoded.len(),
            });
        }
    }

    Ok(decoded)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::blte::compression::deflate;
    use crate::blte::encryption::{EncryptedHeader, EncryptionType, encrypt_payload};
    use cascfetch_crypto::TactKey;

    fn keys() -> TactKeyStore {
        let mut keys = TactKeyStore::empty();
        keys.add(TactKey::new(7, [0x5A; 16]));
        keys
    }

    fn wrap_encrypted(inner: &[u8], index: usize) -> Vec<u8> {
        let header = EncryptedHeader {
            key_name: 7,
            iv: vec![0, 1, 2, 3, 4, 5, 6, 7],
            encryption_type: EncryptionType::Salsa20,
        };
        let mut chunk = vec![b'E'];
        chunk.extend(encrypt_payload(&header, &[0x5A; 16], index, inner).expect("encrypt"));
        chunk
    }

    #[test]
    fn test_plain_chunk() {
        let out = decode_chunk(b"Nhello", 0, &keys(), Some(5)).expect("plain chunk");
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_zlib_size_must_match() {
        let mut chunk = vec![b'Z'];
        chunk.extend(deflate(b"twelve bytes").expect("deflate"));
        assert_eq!(
            decode_chunk(&chunk, 0, &keys(), Some(12)).expect("size matches"),
            b"twelve bytes"
        );
        assert!(matches!(
            decode_chunk(&chunk, 3, &keys(), Some(13)),
            Err(BlteError::DecodedSizeMismatch {
                chunk: 3,
                expected: 13,
                actual: 12
            })
        ));
    }

    #[test]
    fn test_encrypted_inner_zlib() {
        let mut inner = vec![b'Z'];
        inner.extend(deflate(b"secret data").expect("deflate"));
        let chunk = wrap_encrypted(&inner, 1);
        let out = decode_chunk(&chunk, 1, &keys(), Some(11)).expect("decrypts");
        assert_eq!(out, b"secret data");
    }

    #[test]
    fn test_encrypted_twice_is_allowed() {
        let chunk = wrap_encrypted(&wrap_encrypted(b"Ndeep", 0), 0);
        assert_eq!(decode_chunk(&chunk, 0, &keys(), None).expect("depth 2"), b"deep");
    }

    #[test]
    fn test_nesting_is_bounded() {
        let mut chunk = b"Nx".to_vec();
        for _ in 0..=MAX_NESTING_DEPTH {
            chunk = wrap_encrypted(&chunk, 0);
        }
        assert!(matches!(
            decode_chunk(&chunk, 0, &keys(), None),
            Err(BlteError::NestingTooDeep(_))
        ));
    }

    #[test]
    fn test_unknown_and_frame_modes() {
        assert!(matches!(
            decode_chunk(b"Qabc", 0, &keys(), None),
            Err(BlteError::UnknownChunkMode(b'Q'))
        ));
        assert!(matches!(
            decode_chunk(b"Fabc", 0, &keys(), None),
            Err(BlteError::UnsupportedChunkMode(b'F'))
        ));
        assert!(matches!(
            decode_chunk(b"", 4, &keys(), None),
            Err(BlteError::EmptyChunk(4))
        ));
    }
}
