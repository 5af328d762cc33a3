//! Client settings from the command line and environment
//!
//! Every option can also be given through a `CASCFETCH_*` environment
//! variable. Positional arguments are identifier/destination pairs.
//!
//! ```no_run
//! use cascfetch::ClientConfig;
//!
//! let config = ClientConfig::from_args();
//! config.validate().expect("invalid settings");
//! for (identifier, destination) in config.requests() {
//!     println!("{identifier} -> {}", destination.display());
//! }
//! ```

use std::path::PathBuf;

use cascfetch_formats::root::LocaleFlags;
use clap::Parser;

use crate::error::ConfigError;

/// Settings for one run of the client
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cascfetch",
    about = "Fetch World of Warcraft files by FileDataID or name",
    version
)]
pub struct ClientConfig {
    /// Directory for configs, indexes and key tables
    #[arg(long, env = "CASCFETCH_CACHE_DIR", default_value = "./cache")]
    pub cache_dir: PathBuf,

    /// Local installation to read from before the CDN
    #[arg(long, env = "CASCFETCH_WOW_PATH")]
    pub wow_path: Option<PathBuf>,

    /// Product code
    #[arg(long, env = "CASCFETCH_PROGRAM", default_value = "wow")]
    pub program: String,

    /// Region code
    #[arg(long, env = "CASCFETCH_REGION", default_value = "us")]
    pub region: String,

    /// Locale used for root lookups
    #[arg(long, env = "CASCFETCH_LOCALE", default_value = "enUS")]
    pub locale: String,

    /// Extra encryption keys, one `<name> <key>` pair per line
    #[arg(long, env = "CASCFETCH_KEYS")]
    pub keys: Option<PathBuf>,

    /// Log as JSON
    #[arg(long)]
    pub json: bool,

    /// Identifier and destination pairs
    #[arg(value_name = "IDENTIFIER DEST", required = true, num_args = 2..)]
    pub pairs: Vec<String>,
}

impl ClientConfig {
    /// Parse from the process arguments
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Settings with defaults for everything but the cache directory
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            wow_path: None,
            program: "wow".to_string(),
            region: "us".to_string(),
            locale: "enUS".to_string(),
            keys: None,
            json: false,
            pairs: Vec::new(),
        }
    }

    /// Check what clap cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.locale_flags()?;
        if let Some(path) = &self.wow_path {
            if !path.exists() {
                return Err(ConfigError::MissingInstallPath(path.clone()));
            }
        }
        if self.pairs.len() % 2 != 0 {
            return Err(ConfigError::UnpairedArguments(self.pairs.len()));
        }
        Ok(())
    }

    /// Locale as root flags
    pub fn locale_flags(&self) -> Result<LocaleFlags, ConfigError> {
        LocaleFlags::from_name(&self.locale).ok_or_else(|| ConfigError::UnknownLocale(self.locale.clone()))
    }

    /// Identifier/destination pairs; a trailing unpaired argument is ignored
    pub fn requests(&self) -> Vec<(String, PathBuf)> {
        self.pairs
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), PathBuf::from(&pair[1])))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::try_parse_from(["cascfetch", "1302850", "out/key.db2"])
            .expect("parse");
        assert_eq!(config.program, "wow");
        assert_eq!(config.region, "us");
        assert_eq!(config.locale_flags().expect("locale"), LocaleFlags::EN_US);
        assert_eq!(
            config.requests(),
            vec![("1302850".to_string(), PathBuf::from("out/key.db2"))]
        );
        config.validate().expect("valid");
    }

    #[test]
    fn test_requires_pairs() {
        assert!(ClientConfig::try_parse_from(["cascfetch"]).is_err());

        let config = ClientConfig::try_parse_from(["cascfetch", "a", "b", "c"]).expect("parse");
        assert!(matches!(config.validate(), Err(ConfigError::UnpairedArguments(3))));
    }

    #[test]
    fn test_rejects_unknown_locale() {
        let config =
            ClientConfig::try_parse_from(["cascfetch", "--locale", "xxYY", "1", "a"]).expect("parse");
        assert!(matches!(config.validate(), Err(ConfigError::UnknownLocale(l)) if l == "xxYY"));
    }

    #[test]
    fn test_rejects_missing_install() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = ClientConfig::new(dir.path());
        config.wow_path = Some(dir.path().join("missing"));
        assert!(matches!(config.validate(), Err(ConfigError::MissingInstallPath(_))));

        config.wow_path = Some(dir.path().to_path_buf());
        config.validate().expect("valid");
    }
}
