//! Decoded field values

/// One field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Inline bytes of an unpacked field, e.g. a `uint8[16]` key
    Bytes(Vec<u8>),
    /// Scalar from bitpacked, common or pallet storage
    Int(i64),
    /// Values of a pallet array
    Array(Vec<u32>),
}

impl FieldValue {
    /// Little-endian byte form of the value
    ///
    /// Scalars that fit in 32 bits produce 4 bytes, others 8. Arrays are
    /// the concatenation of their 32-bit elements.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => bytes.clone(),
            Self::Int(value) => match u32::try_from(*value) {
                Ok(small) => small.to_le_bytes().to_vec(),
                Err(_) => value.to_le_bytes().to_vec(),
            },
            Self::Array(values) => values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    /// Scalar value, reading up to 8 inline bytes little-endian
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int(value) => u64::try_from(*value).ok(),
            Self::Bytes(bytes) if bytes.len() <= 8 => Some(
                bytes
                    .iter()
                    .rev()
                    .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
            ),
            _ => None,
        }
    }
}
