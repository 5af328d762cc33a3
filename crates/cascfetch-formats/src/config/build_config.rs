//! Build config: references to the encoding, root and install blobs

use crate::config::{ConfigError, ConfigFile};

/// Build configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    file: ConfigFile,
}

impl BuildConfig {
    /// Parse build config text
    pub fn parse(data: &[u8]) -> Result<Self, ConfigError> {
        Ok(Self {
            file: ConfigFile::parse(data)?,
        })
    }

    /// Content key of the root file
    pub fn root(&self) -> Result<Option<&str>, ConfigError> {
        self.file.hash("root", 0)
    }

    /// Content key of the install manifest
    pub fn install(&self) -> Result<Option<&str>, ConfigError> {
        self.file.hash("install", 0)
    }

    /// Content key of the encoding file
    pub fn encoding_content_key(&self) -> Result<Option<&str>, ConfigError> {
        self.file.hash("encoding", 0)
    }

    /// Encoding key of the encoding file; it is fetched by this key
    pub fn encoding_key(&self) -> Result<Option<&str>, ConfigError> {
        self.file.hash("encoding", 1)
    }

    /// Human-readable build name
    pub fn build_name(&self) -> Option<String> {
        self.file.values("build-name").map(|v| v.join(" "))
    }

    /// Underlying key/value lines
    pub fn raw(&self) -> &ConfigFile {
        &self.file
    }
}
