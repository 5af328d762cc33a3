//! BLTE container builder for fixtures

use super::chunk::ChunkMode;
use super::compression::{deflate, lz4_compress};
use super::encryption::{EncryptedHeader, EncryptionType, encrypt_payload};
use super::error::{BlteError, BlteResult};
use super::header::{BlteHeader, ChunkInfo, HeaderFlags};

#[derive(Debug, Clone)]
enum PendingChunk {
    Plain {
        data: Vec<u8>,
        mode: ChunkMode,
    },
    Encrypted {
        data: Vec<u8>,
        inner: ChunkMode,
        key_name: u64,
        key: [u8; 16],
        iv: [u8; 4],
    },
}

impl PendingChunk {
    fn decoded_len(&self) -> usize {
        match self {
            Self::Plain { data, .. } | Self::Encrypted { data, .. } => data.len(),
        }
    }

    fn decoded(&self) -> &[u8] {
        match self {
            Self::Plain { data, .. } | Self::Encrypted { data, .. } => data,
        }
    }

    fn encode(&self, index: usize) -> BlteResult<Vec<u8>> {
        match self {
            Self::Plain { data, mode } => encode_plain(data, *mode),
            Self::Encrypted {
                data,
                inner,
                key_name,
                key,
                iv,
            } => {
                let inner_chunk = encode_plain(data, *inner)?;
                let header = EncryptedHeader {
                    key_name: *key_name,
                    iv: iv.to_vec(),
                    encryption_type: EncryptionType::Salsa20,
                };
                let mut chunk = vec![ChunkMode::Encrypted.as_byte()];
                chunk.extend(encrypt_payload(&header, key, index, &inner_chunk)?);
                Ok(chunk)
            }
        }
    }
}

fn encode_plain(data: &[u8], mode: ChunkMode) -> BlteResult<Vec<u8>> {
    let mut chunk = vec![mode.as_byte()];
    match mode {
        ChunkMode::None => chunk.extend_from_slice(data),
        ChunkMode::ZLib => chunk.extend(deflate(data)?),
        ChunkMode::Lz4 => chunk.extend(lz4_compress(data)),
        ChunkMode::Encrypted | ChunkMode::Frame => {
            return Err(BlteError::UnsupportedChunkMode(mode.as_byte()));
        }
    }
    Ok(chunk)
}

/// Builds BLTE containers chunk by chunk
#[derive(Debug, Clone, Default)]
pub struct BlteBuilder {
    chunks: Vec<PendingChunk>,
    extended: bool,
}

impl BlteBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a headerless single-chunk container
    pub fn single_chunk(data: &[u8], mode: ChunkMode) -> BlteResult<Vec<u8>> {
        let mut out = b"BLTE\0\0\0\0".to_vec();
        out.extend(encode_plain(data, mode)?);
        Ok(out)
    }

    /// Use 40-byte chunk infos carrying decoded checksums
    #[must_use]
    pub fn extended(mut self) -> Self {
        self.extended = true;
        self
    }

    /// Append a plain chunk
    #[must_use]
    pub fn chunk(mut self, data: &[u8], mode: ChunkMode) -> Self {
        self.chunks.push(PendingChunk::Plain {
            data: data.to_vec(),
            mode,
        });
        self
    }

    /// Append a Salsa20-encrypted chunk wrapping an `inner` mode chunk
    #[must_use]
    pub fn encrypted_chunk(
        mut self,
        data: &[u8],
        inner: ChunkMode,
        key_name: u64,
        key: [u8; 16],
        iv: [u8; 4],
    ) -> Self {
        self.chunks.push(PendingChunk::Encrypted {
            data: data.to_vec(),
            inner,
            key_name,
            key,
            iv,
        });
        self
    }

    /// Produce the container with a chunk table
    pub fn build(self) -> BlteResult<Vec<u8>> {
        if self.chunks.is_empty() {
            return Err(BlteError::InvalidChunkCount(0));
        }

        let flags = if self.extended {
            HeaderFlags::Extended
        } else {
            HeaderFlags::Standard
        };

        let mut infos = Vec::with_capacity(self.chunks.len());
        let mut body = Vec::new();
        for (index, pending) in self.chunks.iter().enumerate() {
            let encoded = pending.encode(index)?;
            infos.push(ChunkInfo {
                compressed_size: encoded.len() as u32,
                decompressed_size: pending.decoded_len() as u32,
                checksum: md5::compute(&encoded).0,
                decompressed_checksum: self
                    .extended
                    .then(|| md5::compute(pending.decoded()).0),
            });
            body.extend(encoded);
        }

        let header = BlteHeader {
            header_size: (12 + infos.len() * flags.chunk_info_size()) as u32,
            flags: Some(flags),
            chunks: infos,
        };

        let mut out = header.to_bytes()?;
        out.extend(body);
        Ok(out)
    }
}
