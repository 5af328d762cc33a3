//! Bob Jenkins' lookup3 `hashlittle2`, used for root file name hashes

use std::fmt;

/// 64-bit name hash of a normalized file path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Jenkins96(u64);

impl Jenkins96 {
    /// Hash raw bytes, `pc` in the high half and `pb` in the low half
    pub fn hash(data: &[u8]) -> Self {
        let (pc, pb) = hashlittle2(data, 0, 0);
        Self((u64::from(pc) << 32) | u64::from(pb))
    }

    /// Hash a file path the way root manifests key their name hashes
    ///
    /// Paths are uppercased and use `\` separators before hashing. Root
    /// files store the two 32-bit halves swapped relative to [`Self::hash`].
    ///
    /// ```
    /// use cascfetch_crypto::Jenkins96;
    ///
    /// assert_eq!(
    ///     Jenkins96::name_hash("interface/icons/inv_misc_questionmark.blp"),
    ///     Jenkins96::name_hash("INTERFACE\\ICONS\\INV_MISC_QUESTIONMARK.BLP"),
    /// );
    /// ```
    pub fn name_hash(path: &str) -> u64 {
        let normalized = path.to_ascii_uppercase().replace('/', "\\");
        Self::hash(normalized.as_bytes()).0.rotate_left(32)
    }

    /// Raw 64-bit value
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Jenkins96 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// `hashlittle2` from lookup3.c, returning `(pc, pb)`
pub fn hashlittle2(data: &[u8], pc: u32, pb: u32) -> (u32, u32) {
    let initial = 0xdead_beef_u32
        .wrapping_add(u32::try_from(data.len()).unwrap_or(u32::MAX))
        .wrapping_add(pc);
    let mut a = initial;
    let mut b = initial;
    let mut c = initial.wrapping_add(pb);

    if data.is_empty() {
        return (c, b);
    }

    let mut rest = data;
    while rest.len() > 12 {
        a = a.wrapping_add(read_u32(&rest[0..4]));
        b = b.wrapping_add(read_u32(&rest[4..8]));
        c = c.wrapping_add(read_u32(&rest[8..12]));
        mix(&mut a, &mut b, &mut c);
        rest = &rest[12..];
    }

    // Zero-padding the tail is equivalent to the byte-wise switch in lookup3.c
    let mut tail = [0u8; 12];
    tail[..rest.len()].copy_from_slice(rest);
    a = a.wrapping_add(read_u32(&tail[0..4]));
    b = b.wrapping_add(read_u32(&tail[4..8]));
    c = c.wrapping_add(read_u32(&tail[8..12]));
    final_mix(&mut a, &mut b, &mut c);

    (c, b)
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(4);
    *c = c.wrapping_add(*b);

    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(6);
    *a = a.wrapping_add(*c);

    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(8);
    *b = b.wrapping_add(*a);

    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(16);
    *c = c.wrapping_add(*b);

    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(19);
    *a = a.wrapping_add(*c);

    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(4);
    *b = b.wrapping_add(*a);
}

fn final_mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(14));

    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(11));

    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(25));

    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(16));

    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(4));

    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(14));

    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(24));
}
