//! Network layer for NGDP content retrieval
//!
//! - [`version`]: which build a product is on and which CDN hosts serve it,
//!   asked over HTTP and Ribbit
//! - [`cdn`]: config, data, archive index and byte-range downloads with
//!   host fallback, retries and an optional disk cache
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() -> cascfetch_protocol::Result<()> {
//! use cascfetch_protocol::{CdnClient, version};
//!
//! let info = version::discover_product("wow", "us").await?;
//! let cdn = CdnClient::new(info.hosts.clone(), &info.cdn_path)?;
//! let build_config = cdn.config(&info.build_config).await?;
//! # let _ = build_config;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cdn;
pub mod error;
pub mod retry;
pub mod transport;
pub mod version;

pub use cdn::{CdnClient, ContentType};
pub use error::{ProtocolError, Result};
pub use retry::RetryPolicy;
pub use transport::{HttpClient, ensure_crypto_provider};
pub use version::{HttpVersionSource, RibbitVersionSource, VersionInfo, VersionSource};
