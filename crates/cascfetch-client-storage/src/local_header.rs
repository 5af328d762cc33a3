//! 30-byte local BLTE entry header.
//!
//! CASC writes a 30-byte header before each BLTE blob in archive
//! `.data` files. The encoding key is stored with bytes reversed.
//!
//! Layout (30 bytes total):
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00   | 16   | Encoding key (reversed byte order) |
//! | 0x10   | 4    | Size including this 30-byte header (LE) |
//! | 0x14   | 2    | Flags |
//! | 0x16   | 4    | ChecksumA |
//! | 0x1A   | 4    | ChecksumB |

/// Size of the local header in bytes.
pub const LOCAL_HEADER_SIZE: usize = 0x1E;

/// 30-byte local header preceding each BLTE entry in `.data` archives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeader {
    /// Encoding key (16 bytes, reversed byte order).
    pub encoding_key: [u8; 16],
    /// Total size including this 30-byte header.
    pub size_with_header: u32,
    /// Flags (2 bytes).
    pub flags: u16,
    /// Checksum A (4 bytes).
    pub checksum_a: u32,
    /// Checksum B (4 bytes).
    pub checksum_b: u32,
}

impl LocalHeader {
    /// Header for a blob of `blte_size` bytes stored under `encoding_key`.
    pub fn new(encoding_key: [u8; 16], blte_size: u32) -> Self {
        let mut reversed_key = encoding_key;
        reversed_key.reverse();

        Self {
            encoding_key: reversed_key,
            size_with_header: blte_size + LOCAL_HEADER_SIZE as u32,
            flags: 0,
            checksum_a: 0,
            checksum_b: 0,
        }
    }

    /// Serialize the header to 30 bytes.
    pub fn to_bytes(&self) -> [u8; LOCAL_HEADER_SIZE] {
        let mut buf = [0u8; LOCAL_HEADER_SIZE];
        buf[0x00..0x10].copy_from_slice(&self.encoding_key);
        buf[0x10..0x14].copy_from_slice(&self.size_with_header.to_le_bytes());
        buf[0x14..0x16].copy_from_slice(&self.flags.to_le_bytes());
        buf[0x16..0x1A].copy_from_slice(&self.checksum_a.to_le_bytes());
        buf[0x1A..0x1E].copy_from_slice(&self.checksum_b.to_le_bytes());
        buf
    }

    /// Parse a local header; `None` if the slice is too short.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < LOCAL_HEADER_SIZE {
            return None;
        }

        let mut encoding_key = [0u8; 16];
        encoding_key.copy_from_slice(&data[0x00..0x10]);

        Some(Self {
            encoding_key,
            size_with_header: u32::from_le_bytes([data[0x10], data[0x11], data[0x12], data[0x13]]),
            flags: u16::from_le_bytes([data[0x14], data[0x15]]),
            checksum_a: u32::from_le_bytes([data[0x16], data[0x17], data[0x18], data[0x19]]),
            checksum_b: u32::from_le_bytes([data[0x1A], data[0x1B], data[0x1C], data[0x1D]]),
        })
    }

    /// The encoding key in normal byte order.
    pub fn original_encoding_key(&self) -> [u8; 16] {
        let mut key = self.encoding_key;
        key.reverse();
        key
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_local_header_layout() {
        let key: [u8; 16] = std::array::from_fn(|i| i as u8 + 1);
        let header = LocalHeader::new(key, 1234);

        assert_eq!(header.encoding_key[0], 0x10);
        assert_eq!(header.encoding_key[15], 0x01);
        assert_eq!(header.size_with_header, 1234 + LOCAL_HEADER_SIZE as u32);

        let bytes = header.to_bytes();
        assert_eq!(&bytes[0x10..0x14], &(1264u32).to_le_bytes());

        let parsed = LocalHeader::from_bytes(&bytes).expect("parse");
        assert_eq!(parsed, header);
        assert_eq!(parsed.original_encoding_key(), key);
    }

    #[test]
    fn test_too_short_data_rejected() {
        assert!(LocalHeader::from_bytes(&[0u8; 20]).is_none());
    }
}
