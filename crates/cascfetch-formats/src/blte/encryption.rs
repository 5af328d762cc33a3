//! Encrypted (`E`) chunk payloads

use cascfetch_crypto::{Arc4Cipher, Salsa20Cipher, TactKeyStore};

use super::error::{BlteError, BlteResult};

/// Cipher used by an encrypted chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EncryptionType {
    /// Salsa20 stream cipher
    Salsa20 = b'S',
    /// ARC4 stream cipher
    Arc4 = b'A',
}

impl EncryptionType {
    /// Parse from byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'S' => Some(Self::Salsa20),
            b'A' => Some(Self::Arc4),
            _ => None,
        }
    }
}

/// Header at the start of an encrypted chunk payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedHeader {
    /// Name of the TACT key, little-endian
    pub key_name: u64,
    /// IV, 4 or 8 bytes
    pub iv: Vec<u8>,
    /// Cipher
    pub encryption_type: EncryptionType,
}

impl EncryptedHeader {
    /// Parse the header, returning it with the ciphertext that follows
    pub fn parse(payload: &[u8]) -> BlteResult<(Self, &[u8])> {
        let invalid = |reason: &str| BlteError::InvalidEncryptedChunk(reason.to_string());

        let (&name_size, rest) = payload.split_first().ok_or_else(|| invalid("empty payload"))?;
        if name_size != 8 {
            return Err(invalid(&format!("key name size {name_size}, expected 8")));
        }
        if rest.len() < 8 {
            return Err(invalid("missing key name"));
        }
        let (name, rest) = rest.split_at(8);
        let mut name_bytes = [0u8; 8];
        name_bytes.copy_from_slice(name);

        let (&iv_size, rest) = rest.split_first().ok_or_else(|| invalid("missing IV size"))?;
        if iv_size != 4 && iv_size != 8 {
            return Err(invalid(&format!("IV size {iv_size}, expected 4 or 8")));
        }
        if rest.len() < usize::from(iv_size) {
            return Err(invalid("missing IV"));
        }
        let (iv, rest) = rest.split_at(usize::from(iv_size));

        let (&kind, ciphertext) = rest
            .split_first()
            .ok_or_else(|| invalid("missing encryption type"))?;
        let encryption_type =
            EncryptionType::from_byte(kind).ok_or(BlteError::UnknownEncryptionType(kind))?;

        Ok((
            Self {
                key_name: u64::from_le_bytes(name_bytes),
                iv: iv.to_vec(),
                encryption_type,
            },
            ciphertext,
        ))
    }

    /// Serialize the header
    #[cfg(any(test, feature = "builders"))]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(11 + self.iv.len());
        out.push(8);
        out.extend_from_slice(&self.key_name.to_le_bytes());
        out.push(self.iv.len() as u8);
        out.extend_from_slice(&self.iv);
        out.push(self.encryption_type as u8);
        out
    }
}

/// Decrypt an encrypted chunk payload (everything after the `E` byte)
///
/// The result is itself a chunk, starting with its own mode byte.
pub fn decrypt_payload(
    payload: &[u8],
    keys: &TactKeyStore,
    chunk_index: usize,
) -> BlteResult<Vec<u8>> {
    let (header, ciphertext) = EncryptedHeader::parse(payload)?;
    let key = keys
        .get(header.key_name)
        .ok_or(BlteError::KeyNotFound(header.key_name))?;

    let mut plain = ciphertext.to_vec();
    apply_cipher(&header, key, chunk_index, &mut plain)?;
    Ok(plain)
}

/// Encrypt an inner chunk into an `E` payload
#[cfg(any(test, feature = "builders"))]
pub fn encrypt_payload(
    header: &EncryptedHeader,
    key: &[u8; 16],
    chunk_index: usize,
    inner_chunk: &[u8],
) -> BlteResult<Vec<u8>> {
    let mut body = inner_chunk.to_vec();
    apply_cipher(header, key, chunk_index, &mut body)?;
    let mut out = header.to_bytes();
    out.extend_from_slice(&body);
    Ok(out)
}

fn apply_cipher(
    header: &EncryptedHeader,
    key: &[u8; 16],
    chunk_index: usize,
    data: &mut [u8],
) -> BlteResult<()> {
    match header.encryption_type {
        EncryptionType::Salsa20 => {
            Salsa20Cipher::new(key, &header.iv, chunk_index)?.apply_keystream(data);
        }
        EncryptionType::Arc4 => {
            Arc4Cipher::new(key)
                .ok_or_else(|| BlteError::InvalidEncryptedChunk("empty ARC4 key".to_string()))?
                .apply_keystream(data);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use cascfetch_crypto::TactKey;

    const KEY_NAME: u64 = 0x1122_3344_5566_7788;

    fn header(kind: EncryptionType) -> EncryptedHeader {
        EncryptedHeader {
            key_name: KEY_NAME,
            iv: vec![1, 2, 3, 4],
            encryption_type: kind,
        }
    }

    fn store() -> TactKeyStore {
        let mut keys = TactKeyStore::empty();
        keys.add(TactKey::new(KEY_NAME, [0x33; 16]));
        keys
    }

    #[test]
    fn test_header_layout() {
        let bytes = header(EncryptionType::Salsa20).to_bytes();
        assert_eq!(bytes[0], 8);
        assert_eq!(&bytes[1..9], &KEY_NAME.to_le_bytes());
        assert_eq!(bytes[9], 4);
        assert_eq!(bytes[14], b'S');

        let (parsed, rest) = EncryptedHeader::parse(&bytes).expect("valid header");
        assert_eq!(parsed, header(EncryptionType::Salsa20));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_roundtrip_both_ciphers() {
        for kind in [EncryptionType::Salsa20, EncryptionType::Arc4] {
            let inner = b"Nplain inner chunk";
            let payload =
                encrypt_payload(&header(kind), &[0x33; 16], 2, inner).expect("encrypt");
            let plain = decrypt_payload(&payload, &store(), 2).expect("decrypt");
            assert_eq!(plain, inner);
        }
    }

    #[test]
    fn test_missing_key_is_reported() {
        let payload = encrypt_payload(&header(EncryptionType::Salsa20), &[0x33; 16], 0, b"Nx")
            .expect("encrypt");
        assert!(matches!(
            decrypt_payload(&payload, &TactKeyStore::empty(), 0),
            Err(BlteError::KeyNotFound(KEY_NAME))
        ));
    }

    #[test]
    fn test_rejects_malformed_headers() {
        assert!(EncryptedHeader::parse(&[]).is_err());
        assert!(EncryptedHeader::parse(&[4, 0, 0, 0, 0]).is_err());

        let mut bytes = header(EncryptionType::Salsa20).to_bytes();
        bytes[9] = 5;
        assert!(EncryptedHeader::parse(&bytes).is_err());

        let mut bytes = header(EncryptionType::Salsa20).to_bytes();
        bytes[14] = b'X';
        assert!(matches!(
            EncryptedHeader::parse(&bytes),
            Err(BlteError::UnknownEncryptionType(b'X'))
        ));
    }
}
