//! CDN client with host fallback and cache integration
//!
//! Every CDN object is addressed by a hex hash and lives at
//! `{scheme}://{host}/{path}/{type}/{ab}/{cd}/{hash}`. Hosts are tried in
//! the order discovery returned them; each host gets the full retry policy
//! before the next one is tried.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use cascfetch_cache::{CacheKey, DiskCache};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::{ProtocolError, Result};
use crate::retry::RetryPolicy;
use crate::transport::{HttpClient, check_status, read_body};

/// CDN directory a hash lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// Build and CDN configs
    Config,
    /// BLTE blobs, archives and their indexes
    Data,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// CDN downloader for one product's host list and path
#[derive(Debug, Clone)]
pub struct CdnClient {
    http: HttpClient,
    hosts: Vec<String>,
    path: String,
    scheme: String,
    retry: RetryPolicy,
    cache: Option<Arc<DiskCache>>,
}

impl CdnClient {
    /// Client for `hosts` serving content under `path` (e.g. `tpr/wow`)
    pub fn new(hosts: Vec<String>, path: impl Into<String>) -> Result<Self> {
        let path = path.into().trim_matches('/').to_string();
        if hosts.is_empty() {
            return Err(ProtocolError::InvalidEndpoint("empty host list".to_string()));
        }
        if let Some(bad) = hosts.iter().find(|h| h.is_empty() || h.contains('/')) {
            return Err(ProtocolError::InvalidEndpoint(bad.clone()));
        }
        Ok(Self {
            http: HttpClient::new()?,
            hosts,
            path,
            scheme: "http".to_string(),
            retry: RetryPolicy::default(),
            cache: None,
        })
    }

    /// Use another URL scheme, e.g. `https`
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Serve and store whole-object downloads through `cache`
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<DiskCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Hosts in the order they are tried
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// CDN path prefix
    pub fn path(&self) -> &str {
        &self.path
    }

    /// URL of `hash` on `host`, with an optional file suffix such as `.index`
    pub fn build_url(
        &self,
        host: &str,
        content_type: ContentType,
        hash: &str,
        suffix: &str,
    ) -> Result<String> {
        if hash.len() < 4 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ProtocolError::InvalidEndpoint(format!("bad hash '{hash}'")));
        }
        let hash = hash.to_ascii_lowercase();
        Ok(format!(
            "{}://{}/{}/{}/{}/{}/{}{}",
            self.scheme,
            host,
            self.path,
            content_type,
            &hash[..2],
            &hash[2..4],
            hash,
            suffix
        ))
    }

    /// Build or CDN config, cached under `config/<hash>`
    pub async fn config(&self, hash: &str) -> Result<Bytes> {
        self.cached(CacheKey::config(hash)?, ContentType::Config, hash, "")
            .await
    }

    /// Data-directory blob, cached under `data/<hash>`
    pub async fn data(&self, hash: &str) -> Result<Bytes> {
        self.cached(CacheKey::archive(hash)?, ContentType::Data, hash, "")
            .await
    }

    /// Archive index, cached under `indexes/<hash>.index`
    pub async fn archive_index(&self, hash: &str) -> Result<Bytes> {
        self.cached(CacheKey::archive_index(hash)?, ContentType::Data, hash, ".index")
            .await
    }

    /// `length` bytes at `offset` of data blob `hash`; never cached
    pub async fn data_range(&self, hash: &str, offset: u64, length: u64) -> Result<Bytes> {
        if length == 0 {
            return Ok(Bytes::new());
        }
        self.each_host(ContentType::Data, hash, "", |url| {
            self.get_range(url, offset, length)
        })
        .await
    }

    async fn cached(
        &self,
        key: CacheKey,
        content_type: ContentType,
        hash: &str,
        suffix: &str,
    ) -> Result<Bytes> {
        if let Some(cache) = &self.cache {
            if let Some(data) = cache.get(&key).await? {
                debug!("Cache hit for {}", key);
                return Ok(data);
            }
            debug!("Cache miss for {}", key);
        }

        let data = self
            .each_host(content_type, hash, suffix, |url| self.get(url))
            .await?;

        if let Some(cache) = &self.cache {
            cache.write(&key, &data).await?;
        }
        Ok(data)
    }

    async fn each_host<'a, F, Fut>(
        &'a self,
        content_type: ContentType,
        hash: &str,
        suffix: &str,
        request: F,
    ) -> Result<Bytes>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Bytes>> + 'a,
    {
        let mut last = None;
        for host in &self.hosts {
            let url = self.build_url(host, content_type, hash, suffix)?;
            match self.retry.execute(|| request(url.clone())).await {
                Ok(data) => return Ok(data),
                Err(e) => {
                    warn!("CDN request {} failed: {}", url, e);
                    last = Some(e);
                }
            }
        }
        let last = last.unwrap_or(ProtocolError::InvalidEndpoint("no hosts".to_string()));
        Err(ProtocolError::AllHostsFailed {
            count: self.hosts.len(),
            last: Box::new(last),
        })
    }

    async fn get(&self, url: String) -> Result<Bytes> {
        debug!("GET {}", url);
        let response = self.http.inner().get(&url).send().await?;
        let response = check_status(response)?;
        read_body(response).await
    }

    async fn get_range(&self, url: String, offset: u64, length: u64) -> Result<Bytes> {
        let end = offset + length - 1;
        debug!("GET {} bytes={}-{}", url, offset, end);
        let response = self
            .http
            .inner()
            .get(&url)
            .header(reqwest::header::RANGE, format!("bytes={offset}-{end}"))
            .send()
            .await?;
        let response = check_status(response)?;
        let partial = response.status() == StatusCode::PARTIAL_CONTENT;
        let body = read_body(response).await?;

        let (start, wanted) = if partial {
            (0, length as usize)
        } else {
            warn!("Server ignored range request for {}", url);
            (offset as usize, length as usize)
        };
        if body.len() < start + wanted {
            return Err(ProtocolError::RangeNotSupported {
                offset,
                length,
                received: body.len(),
            });
        }
        Ok(body.slice(start..start + wanted))
    }
}
