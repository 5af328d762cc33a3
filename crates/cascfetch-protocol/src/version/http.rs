//! Version tables over plain HTTP

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::{ProtocolError, Result};
use crate::retry::RetryPolicy;
use crate::transport::{HttpClient, check_status, read_body};
use crate::version::{DEFAULT_PORT, VersionSource};

/// Patch service at `http://{region}.patch.battle.net:1119/{program}/{table}`
#[derive(Debug, Clone)]
pub struct HttpVersionSource {
    http: HttpClient,
    base: Url,
    program: String,
    region: String,
    retry: RetryPolicy,
}

impl HttpVersionSource {
    /// Source for the public patch service of `region`
    pub fn new(program: &str, region: &str) -> Result<Self> {
        let base = format!("http://{region}.patch.battle.net:{DEFAULT_PORT}/");
        Self::with_base_url(program, region, &base)
    }

    /// Source rooted at another base URL
    pub fn with_base_url(program: &str, region: &str, base: &str) -> Result<Self> {
        let mut base = Url::parse(base)
            .map_err(|e| ProtocolError::InvalidEndpoint(format!("{base}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: HttpClient::new()?,
            base,
            program: program.to_string(),
            region: region.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// URL of a product table
    pub fn table_url(&self, table: &str) -> Result<Url> {
        self.base
            .join(&format!("{}/{}", self.program, table))
            .map_err(|e| ProtocolError::InvalidEndpoint(e.to_string()))
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        debug!("GET {}", url);
        let response = self.http.inner().get(url).send().await?;
        let body = read_body(check_status(response)?).await?;
        Ok(String::from_utf8(body.to_vec())?)
    }
}

#[async_trait]
impl VersionSource for HttpVersionSource {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn table(&self, table: &str) -> Result<String> {
        let url = self.table_url(table)?;
        self.retry.execute(|| self.get_text(url.clone())).await
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn region(&self) -> &str {
        &self.region
    }
}
