//! Content and locale flags for root file blocks

use std::fmt;

/// Content flags shared by every record of a block
///
/// V1-V3 store 32 bits, V4 extends the field to 40 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContentFlags(pub u64);

impl ContentFlags {
    /// Windows platform
    pub const LOAD_ON_WINDOWS: u64 = 0x0001;
    /// macOS platform
    pub const LOAD_ON_MACOS: u64 = 0x0002;
    /// Low violence variant of a file
    pub const LOW_VIOLENCE: u64 = 0x0008;
    /// Do not load
    pub const DO_NOT_LOAD: u64 = 0x0200;
    /// Encrypted content
    pub const ENCRYPTED: u64 = 0x1000;
    /// Block carries no name hash array (V2+)
    pub const NO_NAME_HASH: u64 = 0x2000;
    /// Bundled file
    pub const BUNDLE: u64 = 0x8000;
    /// No compression applied
    pub const NO_COMPRESSION: u64 = 0x0001_0000;

    /// Check if a flag is set
    pub const fn has(self, flag: u64) -> bool {
        (self.0 & flag) != 0
    }

    /// Whether the block stores a name hash per record
    pub const fn has_name_hashes(self) -> bool {
        !self.has(Self::NO_NAME_HASH)
    }
}

impl fmt::Display for ContentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Locale bit set of a root block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocaleFlags(pub u32);

impl LocaleFlags {
    /// All locales
    pub const ALL: Self = Self(0xFFFF_FFFF);
    /// English (United States)
    pub const EN_US: Self = Self(0x0000_0002);
    /// Korean
    pub const KO_KR: Self = Self(0x0000_0004);
    /// French (France)
    pub const FR_FR: Self = Self(0x0000_0010);
    /// German (Germany)
    pub const DE_DE: Self = Self(0x0000_0020);
    /// Chinese (China)
    pub const ZH_CN: Self = Self(0x0000_0040);
    /// Spanish (Spain)
    pub const ES_ES: Self = Self(0x0000_0080);
    /// Chinese (Taiwan)
    pub const ZH_TW: Self = Self(0x0000_0100);
    /// English (Great Britain)
    pub const EN_GB: Self = Self(0x0000_0200);
    /// English (China)
    pub const EN_CN: Self = Self(0x0000_0400);
    /// English (Taiwan)
    pub const EN_TW: Self = Self(0x0000_0800);
    /// Spanish (Mexico)
    pub const ES_MX: Self = Self(0x0000_1000);
    /// Russian
    pub const RU_RU: Self = Self(0x0000_2000);
    /// Portuguese (Brazil)
    pub const PT_BR: Self = Self(0x0000_4000);
    /// Italian (Italy)
    pub const IT_IT: Self = Self(0x0000_8000);
    /// Portuguese (Portugal)
    pub const PT_PT: Self = Self(0x0001_0000);

    const NAMES: [(&'static str, Self); 15] = [
        ("enUS", Self::EN_US),
        ("koKR", Self::KO_KR),
        ("frFR", Self::FR_FR),
        ("deDE", Self::DE_DE),
        ("zhCN", Self::ZH_CN),
        ("esES", Self::ES_ES),
        ("zhTW", Self::ZH_TW),
        ("enGB", Self::EN_GB),
        ("enCN", Self::EN_CN),
        ("enTW", Self::EN_TW),
        ("esMX", Self::ES_MX),
        ("ruRU", Self::RU_RU),
        ("ptBR", Self::PT_BR),
        ("itIT", Self::IT_IT),
        ("ptPT", Self::PT_PT),
    ];

    /// Look up a retail locale by name, case-insensitively (`enUS`, `deDE`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, flags)| *flags)
    }

    /// Name of a single-locale flag set
    pub fn name(self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .find(|(_, flags)| *flags == self)
            .map(|(n, _)| *n)
    }

    /// Raw value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Whether this is the all-locales marker
    pub const fn is_all(self) -> bool {
        self.0 == Self::ALL.0
    }

    /// Whether a block with these flags serves the requested locale
    pub const fn matches(self, requested: Self) -> bool {
        self.is_all() || (self.0 & requested.0) != 0
    }
}

impl fmt::Display for LocaleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:08x}", self.0),
        }
    }
}
