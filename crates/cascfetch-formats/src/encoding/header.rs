use binrw::{BinRead, BinWrite};

use crate::encoding::error::EncodingError;

/// Encoding file header (22 bytes)
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct EncodingHeader {
    /// Magic bytes: 'EN'
    pub magic: [u8; 2],

    /// Version (always 1)
    pub version: u8,

    /// Size of content key hashes
    pub ckey_hash_size: u8,

    /// Size of encoding key hashes
    pub ekey_hash_size: u8,

    /// Content key page size in KB
    pub ckey_page_size_kb: u16,

    /// Encoding key page size in KB
    pub ekey_page_size_kb: u16,

    /// Number of content key pages
    pub ckey_page_count: u32,

    /// Number of encoding key pages
    pub ekey_page_count: u32,

    /// Reserved byte at offset 0x11, must be 0
    pub flags: u8,

    /// Size of the `ESpec` string block that follows the header
    pub espec_block_size: u32,
}

impl EncodingHeader {
    /// Serialized size
    pub const SIZE: usize = 22;

    /// Header with the usual field values and no pages
    pub fn new() -> Self {
        Self {
            magic: *b"EN",
            version: 1,
            ckey_hash_size: 16,
            ekey_hash_size: 16,
            ckey_page_size_kb: 4,
            ekey_page_size_kb: 4,
            ckey_page_count: 0,
            ekey_page_count: 0,
            flags: 0,
            espec_block_size: 0,
        }
    }

    /// Reject headers this reader cannot interpret
    pub fn validate(&self) -> Result<(), EncodingError> {
        if self.magic != *b"EN" {
            return Err(EncodingError::InvalidMagic(self.magic));
        }
        if self.version != 1 {
            return Err(EncodingError::UnsupportedVersion(self.version));
        }
        if self.flags != 0 {
            return Err(EncodingError::InvalidFlags(self.flags));
        }
        if self.ckey_hash_size != 16 {
            return Err(EncodingError::InvalidHashSize {
                field: "ckey",
                value: self.ckey_hash_size,
            });
        }
        if self.ekey_hash_size != 16 {
            return Err(EncodingError::InvalidHashSize {
                field: "ekey",
                value: self.ekey_hash_size,
            });
        }
        if self.ckey_page_size_kb == 0 {
            return Err(EncodingError::InvalidPageSize { field: "ckey" });
        }
        if self.ekey_page_size_kb == 0 {
            return Err(EncodingError::InvalidPageSize { field: "ekey" });
        }
        if self.ckey_page_count == 0 {
            return Err(EncodingError::InvalidPageCount { field: "ckey" });
        }
        if self.ekey_page_count == 0 {
            return Err(EncodingError::InvalidPageCount { field: "ekey" });
        }
        Ok(())
    }

    /// Content key page size in bytes
    pub fn ckey_page_size(&self) -> usize {
        usize::from(self.ckey_page_size_kb) * 1024
    }

    /// Encoding key page size in bytes
    pub fn ekey_page_size(&self) -> usize {
        usize::from(self.ekey_page_size_kb) * 1024
    }
}

impl Default for EncodingHeader {
    fn default() -> Self {
        Self::new()
    }
}
