//! MD5 digests identifying content and its physical encodings

use binrw::{BinRead, BinWrite};
use md5::{Digest, Md5};
use std::fmt;
use std::io::Read;

use crate::error::CryptoError;

fn digest_bytes(digest: &[u8]) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(digest);
    bytes
}

/// Content key: MD5 of the decoded file bytes
///
/// Two files with identical bytes share a content key regardless of how
/// they are compressed or encrypted in storage.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey([u8; 16]);

impl ContentKey {
    /// Create content key from raw bytes
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create content key from data by computing its MD5 hash
    pub fn from_data(data: &[u8]) -> Self {
        Self(digest_bytes(&Md5::digest(data)))
    }

    /// Hash a stream to completion
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, CryptoError> {
        let mut hasher = Md5::new();
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(Self(digest_bytes(&hasher.finalize())))
    }

    /// Parse content key from hex string
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Encoding key: MD5 of one BLTE-encoded byte stream
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodingKey([u8; 16]);

impl EncodingKey {
    /// Create encoding key from raw bytes
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create encoding key from encoded data by computing its MD5 hash
    pub fn from_data(data: &[u8]) -> Self {
        Self(digest_bytes(&Md5::digest(data)))
    }

    /// Parse encoding key from hex string
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 9 bytes, the truncated form stored in local `.idx` journals
    pub fn first_9(&self) -> [u8; 9] {
        let mut result = [0u8; 9];
        result.copy_from_slice(&self.0[..9]);
        result
    }
}

impl fmt::Display for EncodingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn test_content_key_from_data() {
        let key = ContentKey::from_data(b"Hello, World!");
        assert_eq!(key.to_hex(), "65a8e27d8879283831b664bd8b7f0ad4");
    }

    #[test]
    fn test_content_key_from_reader_matches_from_data() {
        let data = vec![0xA5u8; 200_000];
        let streamed = ContentKey::from_reader(Cursor::new(&data)).expect("in-memory read");
        assert_eq!(streamed, ContentKey::from_data(&data));
    }

    #[test]
    fn test_content_key_from_hex() {
        let hex = "65a8e27d8879283831b664bd8b7f0ad4";
        let key = ContentKey::from_hex(hex).expect("Valid hex string for ContentKey");
        assert_eq!(key.to_hex(), hex);
        assert_eq!(format!("{key}"), hex);
    }

    #[test]
    fn test_content_key_rejects_short_hex() {
        assert!(ContentKey::from_hex("65a8e27d").is_err());
    }

    #[test]
    fn test_encoding_key_first_9() {
        let key = EncodingKey::from_bytes([
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f, 0x10,
        ]);
        assert_eq!(
            key.first_9(),
            [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09]
        );
    }

    #[test]
    fn test_keys_read_with_binrw() {
        let bytes = [0x42u8; 16];
        let key = ContentKey::read_le(&mut Cursor::new(&bytes)).expect("16 bytes available");
        assert_eq!(key.as_bytes(), &bytes);
    }
}
