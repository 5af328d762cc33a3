//! Fetch individual files out of NGDP content by `FileDataID` or name
//!
//! A file is found through a chain of tables:
//!
//! 1. [`NameLookup`]s turn an identifier into a content key: the install
//!    manifest by name, then the root file by id or path hash and locale
//! 2. the encoding table turns the content key into one or more encoding keys
//! 3. [`DataSource`]s, a local installation and the CDN, locate an encoding
//!    key, decode its BLTE container and verify the result
//!
//! [`ContentResolver`] runs that chain with a fixed lookup and source order;
//! [`Client`] builds one for a product, region and locale and loads the
//! encryption keys through it.
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() -> Result<(), cascfetch::ResolverError> {
//! use std::path::Path;
//! use cascfetch::{Client, ClientConfig};
//!
//! let client = Client::open(&ClientConfig::new("./cache")).await?;
//! let outcome = client.fetch("1302850", Path::new("TactKey.db2")).await;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod bootstrap;
pub mod client;
pub mod config;
pub mod data_source;
pub mod error;
pub mod identifier;
pub mod name_lookup;
pub mod resolver;

#[cfg(test)]
mod test_support;

pub use bootstrap::{TACT_KEY_FILE_ID, TACT_KEY_LOOKUP_FILE_ID, bootstrap_keys};
pub use client::Client;
pub use config::ClientConfig;
pub use data_source::{DataSource, LocalSource, Location, RemoteSource, decode_verify_commit};
pub use error::{BootstrapError, ConfigError, ExtractError, ResolverError};
pub use identifier::Identifier;
pub use name_lookup::{InstallLookup, NameLookup, RootLookup};
pub use resolver::{Attempt, ContentResolver, ContentResolverBuilder, FailureKind, FetchOutcome};
