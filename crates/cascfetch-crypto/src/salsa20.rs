//! Salsa20 as used by encrypted BLTE chunks
//!
//! TACT keys are 16 bytes, so the state uses the `expand 16-byte k`
//! constants with the key repeated. Chunk IVs are 4 or 8 bytes; shorter
//! IVs are zero-extended to the 8-byte nonce, and the chunk index is
//! XORed into the first four nonce bytes so every chunk gets its own
//! keystream.

use crate::error::CryptoError;

const TAU: [u32; 4] = [0x6170_7865, 0x3120_646e, 0x7962_2d36, 0x6b20_6574];

/// Salsa20/20 keystream generator
pub struct Salsa20Cipher {
    state: [u32; 16],
    keystream: [u8; 64],
    position: usize,
}

impl Salsa20Cipher {
    /// Create a cipher for one chunk
    pub fn new(key: &[u8; 16], iv: &[u8], chunk_index: usize) -> Result<Self, CryptoError> {
        if iv.len() != 4 && iv.len() != 8 {
            return Err(CryptoError::InvalidIvSize(iv.len()));
        }

        let mut nonce = [0u8; 8];
        nonce[..iv.len()].copy_from_slice(iv);
        #[allow(clippy::cast_possible_truncation)]
        let index = (chunk_index as u32).to_le_bytes();
        for (byte, mask) in nonce.iter_mut().zip(index) {
            *byte ^= mask;
        }

        let key_words: [u32; 4] = std::array::from_fn(|i| word(&key[i * 4..]));
        let mut state = [0u32; 16];
        state[0] = TAU[0];
        state[1..5].copy_from_slice(&key_words);
        state[5] = TAU[1];
        state[6] = word(&nonce[0..4]);
        state[7] = word(&nonce[4..8]);
        // state[8..10] is the 64-bit block counter, starting at zero
        state[10] = TAU[2];
        state[11..15].copy_from_slice(&key_words);
        state[15] = TAU[3];

        Ok(Self {
            state,
            keystream: [0; 64],
            position: 64,
        })
    }

    fn refill(&mut self) {
        let mut x = self.state;
        for _ in 0..10 {
            quarter_round(&mut x, 0, 4, 8, 12);
            quarter_round(&mut x, 5, 9, 13, 1);
            quarter_round(&mut x, 10, 14, 2, 6);
            quarter_round(&mut x, 15, 3, 7, 11);

            quarter_round(&mut x, 0, 1, 2, 3);
            quarter_round(&mut x, 5, 6, 7, 4);
            quarter_round(&mut x, 10, 11, 8, 9);
            quarter_round(&mut x, 15, 12, 13, 14);
        }

        for (i, value) in x.iter().enumerate() {
            let out = value.wrapping_add(self.state[i]).to_le_bytes();
            self.keystream[i * 4..i * 4 + 4].copy_from_slice(&out);
        }

        self.state[8] = self.state[8].wrapping_add(1);
        if self.state[8] == 0 {
            self.state[9] = self.state[9].wrapping_add(1);
        }
        self.position = 0;
    }

    /// XOR the keystream into `data`; encryption and decryption are the same
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data {
            if self.position == 64 {
                self.refill();
            }
            *byte ^= self.keystream[self.position];
            self.position += 1;
        }
    }
}

fn word(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn quarter_round(x: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    x[b] ^= x[a].wrapping_add(x[d]).rotate_left(7);
    x[c] ^= x[b].wrapping_add(x[a]).rotate_left(9);
    x[d] ^= x[c].wrapping_add(x[b]).rotate_left(13);
    x[a] ^= x[d].wrapping_add(x[c]).rotate_left(18);
}

/// Decrypt one chunk payload
pub fn decrypt_salsa20(
    data: &[u8],
    key: &[u8; 16],
    iv: &[u8],
    chunk_index: usize,
) -> Result<Vec<u8>, CryptoError> {
    let mut cipher = Salsa20Cipher::new(key, iv, chunk_index)?;
    let mut out = data.to_vec();
    cipher.apply_keystream(&mut out);
    Ok(out)
}

/// Encrypt one chunk payload
pub fn encrypt_salsa20(
    data: &[u8],
    key: &[u8; 16],
    iv: &[u8],
    chunk_index: usize,
) -> Result<Vec<u8>, CryptoError> {
    decrypt_salsa20(data, key, iv, chunk_index)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const KEY: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
        0x0e, 0x0f,
    ];

    #[test]
    fn test_rejects_bad_iv_sizes() {
        for len in [0, 3, 5, 16] {
            let iv = vec![0u8; len];
            assert!(matches!(
                Salsa20Cipher::new(&KEY, &iv, 0),
                Err(CryptoError::InvalidIvSize(n)) if n == len
            ));
        }
    }

    #[test]
    fn test_short_iv_is_zero_extended() {
        let data = [0x5Au8; 100];
        let short = encrypt_salsa20(&data, &KEY, &[1, 2, 3, 4], 0).expect("4-byte iv");
        let long = encrypt_salsa20(&data, &KEY, &[1, 2, 3, 4, 0, 0, 0, 0], 0).expect("8-byte iv");
        assert_eq!(short, long);
    }

    #[test]
    fn test_chunk_index_changes_keystream() {
        let data = [0u8; 32];
        let iv = [9, 9, 9, 9];
        let first = encrypt_salsa20(&data, &KEY, &iv, 0).expect("valid");
        let second = encrypt_salsa20(&data, &KEY, &iv, 1).expect("valid");
        assert_ne!(first, second);

        // Index 1 with iv is the same as index 0 with iv ^ 1
        let shifted = encrypt_salsa20(&data, &KEY, &[8, 9, 9, 9], 0).expect("valid");
        assert_eq!(second, shifted);
    }

    #[test]
    fn test_keystream_continues_across_calls() {
        let data = [0u8; 150];
        let whole = encrypt_salsa20(&data, &KEY, &[0; 8], 3).expect("valid");

        let mut cipher = Salsa20Cipher::new(&KEY, &[0; 8], 3).expect("valid");
        let mut parts = data.to_vec();
        let (head, tail) = parts.split_at_mut(70);
        cipher.apply_keystream(head);
        cipher.apply_keystream(tail);
        assert_eq!(whole, parts);
    }

    proptest! {
        #[test]
        fn prop_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..512), index in 0usize..64) {
            let iv = [0xAB, 0xCD, 0xEF, 0x01];
            let encrypted = encrypt_salsa20(&data, &KEY, &iv, index).unwrap();
            let decrypted = decrypt_salsa20(&encrypted, &KEY, &iv, index).unwrap();
            prop_assert_eq!(decrypted, data);
        }
    }
}
