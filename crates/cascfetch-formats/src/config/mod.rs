//! Build and CDN configuration files
//!
//! Both are text files of `key = value value ...` lines. Values that name
//! other blobs are hex hashes; for paired entries index 0 is the content
//! key and index 1 the encoding key.

mod build_config;
mod cdn_config;

use std::collections::HashMap;

use thiserror::Error;

pub use build_config::BuildConfig;
pub use cdn_config::CdnConfig;

/// Errors from config parsing
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config blob is not UTF-8 text
    #[error("Config is not valid UTF-8")]
    NotText,

    /// A value expected to be a hash is not 32 hex characters
    #[error("Invalid hash in '{key}': {value}")]
    InvalidHash {
        /// Config key
        key: String,
        /// Offending value
        value: String,
    },
}

/// Parsed `key = values` lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    entries: HashMap<String, Vec<String>>,
}

impl ConfigFile {
    /// Parse config text; comments and malformed lines are skipped
    pub fn parse(data: &[u8]) -> Result<Self, ConfigError> {
        let text = std::str::from_utf8(data).map_err(|_| ConfigError::NotText)?;
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(parse_line)
            .map(|(key, value)| {
                let values = value.split_whitespace().map(String::from).collect();
                (key, values)
            })
            .collect();
        Ok(Self { entries })
    }

    /// All values of a key
    pub fn values(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Value at `index` of a key
    pub fn value(&self, key: &str, index: usize) -> Option<&str> {
        self.values(key)?.get(index).map(String::as_str)
    }

    /// Value at `index`, checked to be an MD5 hex string
    pub fn hash(&self, key: &str, index: usize) -> Result<Option<&str>, ConfigError> {
        match self.value(key, index) {
            Some(value) if !is_valid_md5_hex(value) => Err(ConfigError::InvalidHash {
                key: key.to_string(),
                value: value.to_string(),
            }),
            other => Ok(other),
        }
    }
}

fn parse_line(line: &str) -> Option<(String, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    is_valid_key(key).then(|| (key.to_string(), value.trim()))
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub(crate) fn is_valid_md5_hex(hash: &str) -> bool {
    hash.len() == 32 && hash.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        let config = ConfigFile::parse(
            b"# Build Configuration\n\nroot = 0123456789abcdef0123456789abcdef\nbuild-name = WOW-1 patch 1.0\nnot a pair\n",
        )
        .expect("parse");
        assert_eq!(config.value("root", 0), Some("0123456789abcdef0123456789abcdef"));
        assert_eq!(
            config.values("build-name").expect("name"),
            &["WOW-1", "patch", "1.0"]
        );
        assert!(config.values("not a pair").is_none());
    }

    #[test]
    fn test_hash_validation() {
        let config = ConfigFile::parse(b"root = nothex\n").expect("parse");
        assert!(matches!(
            config.hash("root", 0),
            Err(ConfigError::InvalidHash { .. })
        ));
        assert_eq!(config.hash("root", 1).expect("absent"), None);
        assert!(ConfigFile::parse(&[0xFF, 0xFE]).is_err());
    }
}
