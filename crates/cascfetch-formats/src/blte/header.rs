//! BLTE header and chunk table

use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};

use super::error::{BlteError, BlteResult};

/// BLTE magic bytes
pub const BLTE_MAGIC: [u8; 4] = *b"BLTE";

/// Bytes before the chunk table: magic, header size, flags, 24-bit count
const TABLE_PREAMBLE: usize = 12;

/// Header flags for chunk table format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HeaderFlags {
    /// Standard chunk info (24 bytes per chunk)
    Standard = 0x0F,
    /// Extended chunk info (40 bytes per chunk)
    Extended = 0x10,
}

impl HeaderFlags {
    /// Parse from byte value
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x0F => Some(Self::Standard),
            0x10 => Some(Self::Extended),
            _ => None,
        }
    }

    /// Size of each chunk info entry
    pub fn chunk_info_size(self) -> usize {
        match self {
            Self::Standard => 24,
            Self::Extended => 40,
        }
    }
}

/// One chunk table entry
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big, import(extended: bool))]
pub struct ChunkInfo {
    /// Encoded size including the mode byte
    pub compressed_size: u32,
    /// Decoded size
    pub decompressed_size: u32,
    /// MD5 of the encoded chunk including the mode byte
    pub checksum: [u8; 16],
    /// MD5 of the decoded chunk (extended tables only)
    #[brw(if(extended))]
    pub decompressed_checksum: Option<[u8; 16]>,
}

/// Parsed BLTE header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlteHeader {
    /// Header size as stored; zero means a single headerless chunk
    pub header_size: u32,
    /// Chunk table format, absent for single-chunk blobs
    pub flags: Option<HeaderFlags>,
    /// Chunk table, empty for single-chunk blobs
    pub chunks: Vec<ChunkInfo>,
}

impl BlteHeader {
    /// Parse the header at the start of `data`
    pub fn parse(data: &[u8]) -> BlteResult<Self> {
        ensure_len(data, 8)?;

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&data[..4]);
        if magic != BLTE_MAGIC {
            return Err(BlteError::InvalidMagic(magic));
        }

        let header_size = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if header_size == 0 {
            return Ok(Self {
                header_size,
                flags: None,
                chunks: Vec::new(),
            });
        }

        ensure_len(data, TABLE_PREAMBLE)?;
        let flags = HeaderFlags::from_byte(data[8]).ok_or(BlteError::InvalidHeaderFlags(data[8]))?;
        let count = u32::from_be_bytes([0, data[9], data[10], data[11]]);
        if count == 0 {
            return Err(BlteError::InvalidChunkCount(count));
        }

        let expected = TABLE_PREAMBLE + count as usize * flags.chunk_info_size();
        if header_size as usize != expected {
            return Err(BlteError::InvalidHeaderSize {
                declared: header_size,
                expected,
            });
        }
        ensure_len(data, expected)?;

        let extended = flags == HeaderFlags::Extended;
        let mut cursor = Cursor::new(&data[TABLE_PREAMBLE..expected]);
        let chunks = (0..count)
            .map(|_| ChunkInfo::read_args(&mut cursor, (extended,)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            header_size,
            flags: Some(flags),
            chunks,
        })
    }

    /// Whether the blob is one headerless chunk
    pub fn is_single_chunk(&self) -> bool {
        self.header_size == 0
    }

    /// Offset of the first chunk
    pub fn data_offset(&self) -> usize {
        if self.is_single_chunk() {
            8
        } else {
            self.header_size as usize
        }
    }

    /// Serialize the header
    #[cfg(any(test, feature = "builders"))]
    pub fn to_bytes(&self) -> BlteResult<Vec<u8>> {
        use std::io::Write;

        let mut out = Cursor::new(Vec::new());
        out.write_all(&BLTE_MAGIC).map_err(binrw::Error::Io)?;
        out.write_all(&self.header_size.to_be_bytes())
            .map_err(binrw::Error::Io)?;
        if let Some(flags) = self.flags {
            let count = (self.chunks.len() as u32).to_be_bytes();
            out.write_all(&[flags as u8, count[1], count[2], count[3]])
                .map_err(binrw::Error::Io)?;
            let extended = flags == HeaderFlags::Extended;
            for info in &self.chunks {
                info.write_args(&mut out, (extended,))?;
            }
        }
        Ok(out.into_inner())
    }
}

fn ensure_len(data: &[u8], needed: usize) -> BlteResult<()> {
    if data.len() < needed {
        return Err(BlteError::Truncated {
            needed,
            available: data.len(),
        });
    }
    Ok(())
}
