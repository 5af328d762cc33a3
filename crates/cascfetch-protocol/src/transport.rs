//! Shared HTTP transport
//!
//! One reqwest client is built per process and reused by every CDN and
//! version request, so connection pools survive across calls.

use std::sync::{Arc, Once, OnceLock};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::{Client, ClientBuilder};

use crate::error::{ProtocolError, Result};

/// Largest single response body accepted
pub const MAX_RESPONSE_SIZE: usize = 1024 * 1024 * 1024;

static GLOBAL_HTTP_CLIENT: OnceLock<Arc<Client>> = OnceLock::new();
static CRYPTO_PROVIDER: Once = Once::new();

/// Install the ring provider as the process default for rustls
///
/// reqwest is built without a bundled provider. Safe to call repeatedly;
/// an already-installed provider is left in place.
pub fn ensure_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// HTTP client handle backed by the shared pool
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Handle to the shared client, building it on first use
    pub fn new() -> Result<Self> {
        ensure_crypto_provider();
        let client = GLOBAL_HTTP_CLIENT.get_or_init(|| {
            Arc::new(Self::create_client().unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            }))
        });
        Ok(Self {
            client: Arc::clone(client),
        })
    }

    fn create_client() -> Result<Client> {
        ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .use_rustls_tls()
            .https_only(false)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent(concat!("cascfetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Into::into)
    }

    /// Underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status.is_server_error() {
        Err(ProtocolError::ServerError(status))
    } else {
        Err(ProtocolError::HttpStatus(status))
    }
}

pub(crate) async fn read_body(response: reqwest::Response) -> Result<Bytes> {
    let mut body = BytesMut::with_capacity(
        response
            .content_length()
            .map_or(0, |len| (len as usize).min(64 * 1024 * 1024)),
    );
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > MAX_RESPONSE_SIZE {
            return Err(ProtocolError::ResponseTooLarge {
                limit: MAX_RESPONSE_SIZE,
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}
