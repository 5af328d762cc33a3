//! Version tables over Ribbit v2 (TCP)
//!
//! The client writes one command line, half-closes the socket and reads
//! the BPSV answer until the server closes the connection.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

use crate::error::{ProtocolError, Result};
use crate::retry::RetryPolicy;
use crate::version::{DEFAULT_PORT, VersionSource};

/// Largest Ribbit response accepted
const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

/// Ribbit service at `{region}.version.battle.net:1119`
#[derive(Debug, Clone)]
pub struct RibbitVersionSource {
    address: String,
    program: String,
    region: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    retry: RetryPolicy,
}

impl RibbitVersionSource {
    /// Source for the public Ribbit service of `region`
    pub fn new(program: &str, region: &str) -> Self {
        Self::with_address(program, region, format!("{region}.version.battle.net:{DEFAULT_PORT}"))
    }

    /// Source talking to `host:port`
    pub fn with_address(program: &str, region: &str, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            program: program.to_string(),
            region: region.to_string(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Command line for a product table
    pub fn command(&self, table: &str) -> String {
        format!("v2/products/{}/{}", self.program, table)
    }

    async fn query(&self, command: &str) -> Result<String> {
        trace!("Connecting to Ribbit host: {}", self.address);
        let mut stream =
            tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.address))
                .await
                .map_err(|_| ProtocolError::Timeout)??;

        trace!("Sending command: {}", command);
        stream.write_all(format!("{command}\r\n").as_bytes()).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        let mut chunk = [0u8; 8192];
        tokio::time::timeout(self.read_timeout, async {
            loop {
                let n = stream.read(&mut chunk).await?;
                if n == 0 {
                    return Ok(());
                }
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_RESPONSE_SIZE {
                    return Err(ProtocolError::ResponseTooLarge {
                        limit: MAX_RESPONSE_SIZE,
                    });
                }
            }
        })
        .await
        .map_err(|_| ProtocolError::Timeout)??;

        Ok(String::from_utf8(buffer)?)
    }
}

#[async_trait]
impl VersionSource for RibbitVersionSource {
    fn name(&self) -> &'static str {
        "Ribbit"
    }

    async fn table(&self, table: &str) -> Result<String> {
        let command = self.command(table);
        self.retry.execute(|| self.query(&command)).await
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn region(&self) -> &str {
        &self.region
    }
}
