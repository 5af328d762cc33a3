//! TACT encryption key management
//!
//! Keys are identified by their 64-bit key name (the 8-byte name carried in
//! encrypted BLTE chunks, read little-endian). The store only ever grows
//! during a session: keys are merged in, and the only removal is a bulk
//! [`TactKeyStore::clear`] when a client reinitialises.

use std::collections::HashMap;
use std::fmt;

use crate::error::CryptoError;

/// A TACT encryption key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TactKey {
    /// Key name as a little-endian integer
    pub id: u64,
    /// 16-byte encryption key
    pub key: [u8; 16],
}

impl TactKey {
    /// Create a new TACT key
    pub const fn new(id: u64, key: [u8; 16]) -> Self {
        Self { id, key }
    }

    /// Build a key from the raw 8-byte name and 16-byte key found in key tables
    pub fn from_slices(name: &[u8], key: &[u8]) -> Result<Self, CryptoError> {
        let name: [u8; 8] = name.try_into().map_err(|_| CryptoError::InvalidKeySize {
            expected: 8,
            actual: name.len(),
        })?;
        let key: [u8; 16] = key.try_into().map_err(|_| CryptoError::InvalidKeySize {
            expected: 16,
            actual: key.len(),
        })?;
        Ok(Self::new(u64::from_le_bytes(name), key))
    }

    /// Parse key from hex string
    pub fn from_hex(id: u64, hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex.trim())
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid hex: {e}")))?;
        Self::from_slices(&id.to_le_bytes(), &bytes)
    }
}

impl fmt::Display for TactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}: {}", self.id, hex::encode_upper(self.key))
    }
}

/// Additive store of TACT encryption keys
#[derive(Debug, Clone)]
pub struct TactKeyStore {
    keys: HashMap<u64, [u8; 16]>,
}

impl TactKeyStore {
    /// Create a key store seeded with well-known keys
    pub fn new() -> Self {
        let mut store = Self::empty();
        store.load_known_keys();
        store
    }

    /// Create an empty key store
    pub fn empty() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    fn load_known_keys(&mut self) {
        // Battle for Azeroth
        self.add_key_from_hex(0xFA50_5078_126A_CB3E, "BDC51862ABED79B2DE48C8E7E66C6200");
        self.add_key_from_hex(0xFF81_3F7D_062A_C0BC, "AA0B5C77F088CCC2D39049BD267F066D");
        self.add_key_from_hex(0xD1E9_B5ED_F928_3668, "8E4A2579894E38B4AB9058BA5C7328EE");

        // Shadowlands
        self.add_key_from_hex(0xB767_2964_1141_CB34, "9849D1AA7B1FD09819C5C66283A326EC");
        self.add_key_from_hex(0xFFB9_469F_F16E_6BF8, "D514BD1909A9E5DC8703F4B8BB1DFD9A");

        // Classic
        self.add_key_from_hex(0xDEE3_A052_1EFF_6F03, "AD740CE3FFFF9231468126985708E1B9");
    }

    fn add_key_from_hex(&mut self, id: u64, hex: &str) {
        if let Ok(key) = TactKey::from_hex(id, hex) {
            self.add(key);
        }
    }

    /// Get a key by name
    pub fn get(&self, id: u64) -> Option<&[u8; 16]> {
        self.keys.get(&id)
    }

    /// Add a key, replacing any previous value for the same name
    pub fn add(&mut self, key: TactKey) {
        self.keys.insert(key.id, key.key);
    }

    /// Merge keys into the store, returning how many were new or changed
    pub fn extend<I: IntoIterator<Item = TactKey>>(&mut self, keys: I) -> usize {
        keys.into_iter()
            .filter(|key| self.keys.insert(key.id, key.key) != Some(key.key))
            .count()
    }

    /// Drop every key; used only when a client reinitialises
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Number of keys in the store
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Load keys from text content (`key_name key_hex` per line)
    ///
    /// Lines starting with `#` or `//` are comments. Returns the number of
    /// keys loaded.
    ///
    /// ```
    /// use cascfetch_crypto::keys::TactKeyStore;
    ///
    /// let txt = "# comment\nFA505078126ACB3E BDC51862ABED79B2DE48C8E7E66C6200\n";
    /// let mut store = TactKeyStore::empty();
    /// assert_eq!(store.load_from_txt(txt), 1);
    /// ```
    pub fn load_from_txt(&mut self, content: &str) -> usize {
        let mut count = 0;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            let mut parts = line.split_whitespace();
            let (Some(id), Some(hex)) = (parts.next(), parts.next()) else {
                continue;
            };

            if let Ok(key) = parse_key_id(id).and_then(|id| TactKey::from_hex(id, hex)) {
                self.add(key);
                count += 1;
            }
        }

        count
    }

    /// Iterate over all keys
    pub fn iter(&self) -> impl Iterator<Item = TactKey> + '_ {
        self.keys.iter().map(|(&id, &key)| TactKey::new(id, key))
    }
}

impl Default for TactKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a key name written as hex (`0x` prefixed or 16 hex digits) or decimal
fn parse_key_id(s: &str) -> Result<u64, CryptoError> {
    let s = s.trim();

    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid hex key name: {e}")))
    } else if s.len() == 16 && s.chars().all(|c| c.is_ascii_hexdigit()) {
        u64::from_str_radix(s, 16)
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid hex key name: {e}")))
    } else {
        s.parse()
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid decimal key name: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tact_key_from_hex() {
        let key = TactKey::from_hex(0x1234_5678_90AB_CDEF, "0123456789ABCDEF0123456789ABCDEF")
            .expect("Valid TACT key hex should parse");
        assert_eq!(key.id, 0x1234_5678_90AB_CDEF);
        assert_eq!(key.key[0], 0x01);
        assert_eq!(key.key[15], 0xEF);
    }

    #[test]
    fn test_tact_key_invalid_size() {
        let result = TactKey::from_hex(0x1234, "0123456789ABCDEF");
        assert!(matches!(
            result,
            Err(CryptoError::InvalidKeySize {
                expected: 16,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_from_slices_reads_name_little_endian() {
        let name = [0x3E, 0xCB, 0x6A, 0x12, 0x78, 0x50, 0x50, 0xFA];
        let key = TactKey::from_slices(&name, &[7u8; 16]).expect("sizes are correct");
        assert_eq!(key.id, 0xFA50_5078_126A_CB3E);
        assert!(TactKey::from_slices(&name[..4], &[7u8; 16]).is_err());
    }

    #[test]
    fn test_key_store_known_keys() {
        let store = TactKeyStore::new();
        assert!(!store.is_empty());
        assert!(store.get(0xFA50_5078_126A_CB3E).is_some());
    }

    #[test]
    fn test_extend_counts_new_and_changed_keys() {
        let mut store = TactKeyStore::empty();
        let added = store.extend([TactKey::new(1, [1; 16]), TactKey::new(2, [2; 16])]);
        assert_eq!(added, 2);

        // Same value again is not counted, a changed value is
        let added = store.extend([TactKey::new(1, [1; 16]), TactKey::new(2, [9; 16])]);
        assert_eq!(added, 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(2), Some(&[9; 16]));
    }

    #[test]
    fn test_clear_resets_store() {
        let mut store = TactKeyStore::new();
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_from_txt_skips_bad_lines() {
        let mut store = TactKeyStore::empty();
        let text = "\
// comment
0xFF813F7D062AC0BC AA0B5C77F088CCC2D39049BD267F066D
not-a-key
1000 00112233445566778899AABBCCDDEEFF
FA505078126ACB3E tooshort
";
        assert_eq!(store.load_from_txt(text), 2);
        assert!(store.get(0xFF81_3F7D_062A_C0BC).is_some());
        assert!(store.get(1000).is_some());
    }

    #[test]
    fn test_parse_key_id() {
        assert_eq!(parse_key_id("0x1234").expect("hex"), 0x1234);
        assert_eq!(parse_key_id("0X1234").expect("hex"), 0x1234);
        assert_eq!(
            parse_key_id("DEADBEEF12345678").expect("hex"),
            0xDEAD_BEEF_1234_5678
        );
        assert_eq!(parse_key_id("1000").expect("decimal"), 1000);
    }
}
