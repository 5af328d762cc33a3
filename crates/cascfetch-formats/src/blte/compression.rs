//! zlib and LZ4 chunk payloads

use std::io::Read;

use flate2::read::ZlibDecoder;

use super::error::{BlteError, BlteResult};

/// Maximum allowed decoded size (1 GiB)
///
/// Bounds both a single chunk and the whole decoded blob so that a hostile
/// size field or compression bomb cannot exhaust memory.
pub const MAX_DECOMPRESSION_SIZE: usize = 1024 * 1024 * 1024;

/// Inflate a zlib payload
pub fn inflate(data: &[u8]) -> BlteResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = decoder
            .read(&mut buffer)
            .map_err(|e| BlteError::Decompression(format!("zlib: {e}")))?;
        if read == 0 {
            break;
        }
        if out.len() + read > MAX_DECOMPRESSION_SIZE {
            return Err(BlteError::SizeLimitExceeded((out.len() + read) as u64));
        }
        out.extend_from_slice(&buffer[..read]);
    }

    Ok(out)
}

/// Decode an LZ4 payload: 8-byte little-endian size prefix, then one LZ4 block
pub fn lz4_decompress(data: &[u8]) -> BlteResult<Vec<u8>> {
    if data.len() < 8 {
        return Err(BlteError::Truncated {
            needed: 8,
            available: data.len(),
        });
    }

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&data[..8]);
    let declared = u64::from_le_bytes(prefix);
    let size = usize::try_from(declared)
        .ok()
        .filter(|&size| size <= MAX_DECOMPRESSION_SIZE)
        .ok_or(BlteError::SizeLimitExceeded(declared))?;

    let out = lz4_flex::block::decompress(&data[8..], size)
        .map_err(|e| BlteError::Decompression(format!("lz4: {e}")))?;
    if out.len() != size {
        return Err(BlteError::Decompression(format!(
            "lz4: expected {size} bytes, got {}",
            out.len()
        )));
    }
    Ok(out)
}

/// Deflate a payload for a `Z` chunk
#[cfg(any(test, feature = "builders"))]
pub fn deflate(data: &[u8]) -> BlteResult<Vec<u8>> {
    use flate2::Compression;
    use flate2::read::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(data, Compression::default());
    let mut out = Vec::new();
    encoder
        .read_to_end(&mut out)
        .map_err(|e| BlteError::Compression(format!("zlib: {e}")))?;
    Ok(out)
}

/// Compress a payload for a `4` chunk
#[cfg(any(test, feature = "builders"))]
pub fn lz4_compress(data: &[u8]) -> Vec<u8> {
    let mut out = (data.len() as u64).to_le_bytes().to_vec();
    out.extend_from_slice(&lz4_flex::block::compress(data));
    out
}
