//! Version and CDN host discovery
//!
//! A product's current build is published twice: as plain HTTP documents
//! on the patch service and over the Ribbit TCP protocol. Both return the
//! same pair of BPSV tables (`versions` and `cdns`), which are reduced to a
//! [`VersionInfo`] for one region. [`discover`] asks every source and keeps
//! the answer with the most CDN hosts.

mod http;
mod ribbit;

use async_trait::async_trait;
use cascfetch_formats::bpsv::{self, BpsvDocument};
use tracing::{info, warn};

use crate::error::{ProtocolError, Result};

pub use http::HttpVersionSource;
pub use ribbit::RibbitVersionSource;

/// Default port of both discovery services
pub const DEFAULT_PORT: u16 = 1119;

/// Current build of a product in one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Region code, e.g. `us`
    pub region: String,
    /// Product code, e.g. `wow`
    pub program: String,
    /// Human-readable version, e.g. `11.0.2.56313`
    pub version_name: String,
    /// Hash of the build config
    pub build_config: String,
    /// Hash of the CDN config
    pub cdn_config: String,
    /// CDN path prefix, e.g. `tpr/wow`
    pub cdn_path: String,
    /// CDN hosts in preference order
    pub hosts: Vec<String>,
}

impl VersionInfo {
    /// Combine the `versions` and `cdns` tables for `region`
    ///
    /// A region missing from `cdns` yields an empty host list rather than
    /// an error, so the caller can compare it against other sources.
    pub fn from_documents(
        program: &str,
        region: &str,
        versions: &BpsvDocument,
        cdns: &BpsvDocument,
    ) -> Result<Self> {
        let row = versions.find_row("Region", region).ok_or_else(|| {
            ProtocolError::Parse(format!("no versions row for region '{region}'"))
        })?;
        let field = |name: &str| {
            versions
                .get(row, name)
                .map(str::to_string)
                .ok_or_else(|| ProtocolError::Parse(format!("versions row has no {name}")))
        };
        let build_config = field("BuildConfig")?;
        let cdn_config = field("CDNConfig")?;
        let version_name = field("VersionsName")?;

        let (cdn_path, hosts) = match cdns.find_row("Name", region) {
            Some(row) => (
                cdns.get(row, "Path").unwrap_or_default().to_string(),
                cdns.get(row, "Hosts")
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            ),
            None => (String::new(), Vec::new()),
        };

        Ok(Self {
            region: region.to_string(),
            program: program.to_string(),
            version_name,
            build_config,
            cdn_config,
            cdn_path,
            hosts,
        })
    }
}

/// A service that publishes product versions
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Fetch the raw text of a product table (`versions` or `cdns`)
    async fn table(&self, table: &str) -> Result<String>;

    /// Product code queried
    fn program(&self) -> &str;

    /// Region code queried
    fn region(&self) -> &str;

    /// Fetch and combine both tables
    async fn version_info(&self) -> Result<VersionInfo> {
        let versions = bpsv::parse(&self.table("versions").await?)?;
        let cdns = bpsv::parse(&self.table("cdns").await?)?;
        VersionInfo::from_documents(self.program(), self.region(), &versions, &cdns)
    }
}

/// Query `sources` in order and keep the answer with the most hosts
///
/// A later source replaces an earlier one when it returns at least as many
/// hosts, so with `[http, ribbit]` Ribbit wins ties. A failing source counts
/// as returning no hosts. Fails with [`ProtocolError::NoHosts`] when no
/// source produced a host.
pub async fn discover(
    program: &str,
    region: &str,
    sources: &[&dyn VersionSource],
) -> Result<VersionInfo> {
    let mut chosen: Option<VersionInfo> = None;
    for source in sources {
        match source.version_info().await {
            Ok(info) => {
                let best = chosen.as_ref().map_or(0, |c| c.hosts.len());
                if chosen.is_none() || info.hosts.len() >= best {
                    chosen = Some(info);
                }
            }
            Err(e) => warn!("{} version query failed: {}", source.name(), e),
        }
    }

    match chosen {
        Some(info) if !info.hosts.is_empty() => {
            info!(
                "{} {} version {}",
                info.region, info.program, info.version_name
            );
            Ok(info)
        }
        _ => Err(ProtocolError::NoHosts {
            program: program.to_string(),
            region: region.to_string(),
        }),
    }
}

/// Discover with the public HTTP and Ribbit services for a product
pub async fn discover_product(program: &str, region: &str) -> Result<VersionInfo> {
    let http = HttpVersionSource::new(program, region)?;
    let ribbit = RibbitVersionSource::new(program, region);
    discover(program, region, &[&http, &ribbit]).await
}
