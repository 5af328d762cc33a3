//! Small byte helpers shared by the parsers

/// Read a 40-bit big-endian integer from the first five bytes
pub(crate) fn u40_be(bytes: &[u8]) -> u64 {
    bytes[..5]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Split a NUL-separated string block, dropping empty strings
pub(crate) fn split_cstrings(block: &[u8]) -> Vec<String> {
    block
        .split(|&b| b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// Copy a 16-byte key out of a slice of exactly that length
pub(crate) fn key16(bytes: &[u8]) -> [u8; 16] {
    let mut key = [0u8; 16];
    key.copy_from_slice(&bytes[..16]);
    key
}

/// Read a NUL-terminated string starting at `pos`, returning it and the
/// position after the terminator
pub(crate) fn read_cstring(data: &[u8], pos: usize) -> Option<(String, usize)> {
    let rest = data.get(pos..)?;
    let len = rest.iter().position(|&b| b == 0)?;
    let text = String::from_utf8_lossy(&rest[..len]).into_owned();
    Some((text, pos + len + 1))
}
