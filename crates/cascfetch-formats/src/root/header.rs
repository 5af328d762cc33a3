//! Root version detection and the optional `MFST`/`TSFM` header

use crate::root::error::{Result, RootError};

/// Root file layouts across client generations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootVersion {
    /// No header, interleaved content key and name hash per record
    V1,
    /// `MFST`/`TSFM` header, separated arrays, 17-byte block headers
    V2,
    /// Extended header, otherwise laid out like V2
    V3,
    /// Extended header and 40-bit content flags (18-byte block headers)
    V4,
}

impl RootVersion {
    /// Size of a block header in this layout
    pub const fn block_header_size(self) -> usize {
        match self {
            Self::V1 => 12,
            Self::V2 | Self::V3 => 17,
            Self::V4 => 18,
        }
    }
}

/// Header magic; decides the endianness of the header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootMagic {
    /// `MFST`, big-endian header fields
    Mfst,
    /// `TSFM`, little-endian header fields
    Tsfm,
}

impl RootMagic {
    /// Parse from the first four bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes.get(..4)? {
            b"MFST" => Some(Self::Mfst),
            b"TSFM" => Some(Self::Tsfm),
            _ => None,
        }
    }

    /// On-disk bytes
    pub const fn to_bytes(self) -> [u8; 4] {
        match self {
            Self::Mfst => *b"MFST",
            Self::Tsfm => *b"TSFM",
        }
    }

    fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            Self::Mfst => u32::from_be_bytes(raw),
            Self::Tsfm => u32::from_le_bytes(raw),
        }
    }

    pub(crate) fn write_u32(self, value: u32) -> [u8; 4] {
        match self {
            Self::Mfst => value.to_be_bytes(),
            Self::Tsfm => value.to_le_bytes(),
        }
    }
}

/// Parsed V2+ header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootHeader {
    /// Magic and field endianness
    pub magic: RootMagic,
    /// Block layout implied by the header
    pub version: RootVersion,
    /// Bytes before the first block
    pub size: usize,
    /// Total number of records
    pub total_files: u32,
    /// Number of records carrying a name hash
    pub named_files: u32,
}

impl RootHeader {
    /// Classic V2 header size
    pub const CLASSIC_SIZE: usize = 12;

    /// Detect and parse the header; `None` means a headerless V1 file
    ///
    /// A classic V2 header is `magic, total_files, named_files`. The extended
    /// form is `magic, header_size, version, total_files, named_files, ...`
    /// and is recognised by a small header size followed by a smaller version.
    pub fn parse(data: &[u8]) -> Result<Option<Self>> {
        let Some(magic) = RootMagic::from_bytes(data) else {
            return Ok(None);
        };
        if data.len() < Self::CLASSIC_SIZE {
            return Err(RootError::TruncatedBlock {
                offset: 0,
                needed: Self::CLASSIC_SIZE,
                available: data.len(),
            });
        }

        let value1 = magic.read_u32(&data[4..8]);
        let value2 = magic.read_u32(&data[8..12]);
        let extended = (16..100).contains(&value1) && value2 < 10 && value2 < value1;

        if !extended {
            return Ok(Some(Self {
                magic,
                version: RootVersion::V2,
                size: Self::CLASSIC_SIZE,
                total_files: value1,
                named_files: value2,
            }));
        }

        let header_size = value1;
        if header_size < 20 {
            return Err(RootError::InvalidHeaderSize(header_size));
        }
        let version = match value2 {
            2 => RootVersion::V2,
            3 => RootVersion::V3,
            4 => RootVersion::V4,
            other => return Err(RootError::UnsupportedVersion(other)),
        };
        let size = header_size as usize;
        if data.len() < size {
            return Err(RootError::TruncatedBlock {
                offset: 0,
                needed: size,
                available: data.len(),
            });
        }

        Ok(Some(Self {
            magic,
            version,
            size,
            total_files: magic.read_u32(&data[12..16]),
            named_files: magic.read_u32(&data[16..20]),
        }))
    }
}
