//! CDN config: the archive list and the loose file index

use crate::config::{ConfigError, ConfigFile, is_valid_md5_hex};

/// CDN configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnConfig {
    file: ConfigFile,
}

impl CdnConfig {
    /// Parse CDN config text
    pub fn parse(data: &[u8]) -> Result<Self, ConfigError> {
        Ok(Self {
            file: ConfigFile::parse(data)?,
        })
    }

    /// Archive hashes, in config order
    pub fn archives(&self) -> Result<Vec<&str>, ConfigError> {
        let Some(values) = self.file.values("archives") else {
            return Ok(Vec::new());
        };
        values
            .iter()
            .map(|value| {
                if is_valid_md5_hex(value) {
                    Ok(value.as_str())
                } else {
                    Err(ConfigError::InvalidHash {
                        key: "archives".to_string(),
                        value: value.clone(),
                    })
                }
            })
            .collect()
    }

    /// Hash of the index listing loose CDN files
    pub fn file_index(&self) -> Result<Option<&str>, ConfigError> {
        self.file.hash("file-index", 0)
    }

    /// Underlying key/value lines
    pub fn raw(&self) -> &ConfigFile {
        &self.file
    }
}
