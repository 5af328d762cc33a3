//! Wiring a resolver for one product, region and locale
//!
//! Construction follows the dependency chain of the content tables:
//! discover the build, read its build config, load the encoding table, then
//! install and root through it, then open the data sources. Any failure up to
//! this point is fatal. The key bootstrap runs last and only logs failures.

use std::path::Path;
use std::sync::Arc;

use cascfetch_cache::DiskCache;
use cascfetch_crypto::{ContentKey, TactKeyStore};
use cascfetch_formats::config::{BuildConfig, CdnConfig};
use cascfetch_formats::encoding::EncodingTable;
use cascfetch_formats::install::InstallManifest;
use cascfetch_formats::root::{LocaleFlags, RootFile};
use cascfetch_protocol::version::{self, VersionSource};
use cascfetch_protocol::{CdnClient, HttpVersionSource, RetryPolicy, RibbitVersionSource, VersionInfo};
use tracing::{info, warn};

use crate::bootstrap::bootstrap_keys;
use crate::config::ClientConfig;
use crate::data_source::{LocalSource, RemoteSource};
use crate::error::ResolverError;
use crate::name_lookup::{InstallLookup, RootLookup};
use crate::resolver::{ContentResolver, FetchOutcome};

/// A ready resolver plus what it was built from
#[derive(Debug)]
pub struct Client {
    resolver: ContentResolver,
    cache: Arc<DiskCache>,
    version: VersionInfo,
    locale: LocaleFlags,
}

impl Client {
    /// Build a client against the public version services
    pub async fn open(config: &ClientConfig) -> Result<Self, ResolverError> {
        let http = HttpVersionSource::new(&config.program, &config.region)?;
        let ribbit = RibbitVersionSource::new(&config.program, &config.region);
        Self::open_with_sources(config, &[&http, &ribbit]).await
    }

    /// Build a client, discovering the build through `sources`
    ///
    /// Later sources win ties on host count.
    pub async fn open_with_sources(
        config: &ClientConfig,
        sources: &[&dyn VersionSource],
    ) -> Result<Self, ResolverError> {
        let locale = config.locale_flags()?;
        let cache = Arc::new(DiskCache::open(&config.cache_dir).await?);

        let version = version::discover(&config.program, &config.region, sources).await?;
        info!(
            "Using {} hosts for {} {} ({})",
            version.hosts.len(),
            version.program,
            version.region,
            version.version_name
        );
        let cdn = CdnClient::new(version.hosts.clone(), &version.cdn_path)?
            .with_cache(Arc::clone(&cache))
            .with_retry_policy(RetryPolicy::from_env());

        info!("Loading build config {}", version.build_config);
        let build_config = BuildConfig::parse(&cdn.config(&version.build_config).await?)?;
        let encoding_key = build_config
            .encoding_key()?
            .ok_or(ResolverError::MissingConfigField("encoding"))?
            .to_string();
        let install_key = content_key(build_config.install()?, "install")?;
        let root_key = content_key(build_config.root()?, "root")?;

        let keys = load_keys(config.keys.as_deref()).await?;

        info!("Loading encoding {}", encoding_key);
        let encoding = EncodingTable::from_blte(&cdn.data(&encoding_key).await?, &keys)?;

        info!("Loading install {}", install_key);
        let install_blte = fetch_table(&cdn, &encoding, "install", install_key).await?;
        let install = InstallManifest::from_blte(&install_blte, &keys)?;

        info!("Loading root {}", root_key);
        let root_blte = fetch_table(&cdn, &encoding, "root", root_key).await?;
        let root = RootFile::from_blte(&root_blte, &keys)?;

        info!("Loading CDN config {}", version.cdn_config);
        let cdn_config = CdnConfig::parse(&cdn.config(&version.cdn_config).await?)?;
        let archives = cdn_config.archives()?;
        let file_index = cdn_config.file_index()?;

        let mut builder = ContentResolver::builder()
            .name_lookup(InstallLookup::new(install))
            .name_lookup(RootLookup::new(root, locale));
        if let Some(path) = &config.wow_path {
            info!("Opening local installation {}", path.display());
            builder = builder.data_source(LocalSource::open(path).await?);
        }
        let remote = RemoteSource::open(
            cdn,
            Some(Arc::clone(&cache)),
            &archives,
            file_index,
            config.wow_path.as_deref(),
        )
        .await;
        let mut resolver = builder
            .data_source(remote)
            .encoding(encoding)
            .keys(keys)
            .build()?;

        if let Err(e) = bootstrap_keys(&mut resolver, &cache).await {
            warn!("Encryption keys unavailable: {}", e);
        }

        Ok(Self {
            resolver,
            cache,
            version,
            locale,
        })
    }

    /// Write the file named by `identifier` to `destination` in the configured locale
    pub async fn fetch(&self, identifier: &str, destination: &Path) -> FetchOutcome {
        self.resolver
            .fetch(identifier, destination, Some(self.locale))
            .await
    }

    /// Underlying resolver
    pub fn resolver(&self) -> &ContentResolver {
        &self.resolver
    }

    /// Disk cache shared with the CDN client
    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Build that was discovered
    pub fn version(&self) -> &VersionInfo {
        &self.version
    }
}

fn content_key(value: Option<&str>, field: &'static str) -> Result<ContentKey, ResolverError> {
    let hex = value.ok_or(ResolverError::MissingConfigField(field))?;
    ContentKey::from_hex(hex).map_err(|_| ResolverError::InvalidHash(hex.to_string()))
}

async fn fetch_table(
    cdn: &CdnClient,
    encoding: &EncodingTable,
    table: &'static str,
    content_key: ContentKey,
) -> Result<Vec<u8>, ResolverError> {
    let encoding_key = encoding
        .content_map(&content_key)
        .and_then(|map| map.encoding_keys.first())
        .ok_or(ResolverError::MissingEncodingEntry { table, content_key })?;
    Ok(cdn.data(&encoding_key.to_hex()).await?.to_vec())
}

async fn load_keys(path: Option<&Path>) -> Result<TactKeyStore, ResolverError> {
    let mut keys = TactKeyStore::new();
    if let Some(path) = path {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ResolverError::KeyFile {
                path: path.to_path_buf(),
                source,
            })?;
        let added = keys.load_from_txt(&text);
        info!("Loaded {} keys from {}", added, path.display());
    }
    Ok(keys)
}
