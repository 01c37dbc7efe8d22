//! HTTP client implementation of the sync transport

use crate::protocol::{build_form, DELETED_FILES_HEADER};
use async_trait::async_trait;
use reqwest::Client;
use selfsync_config::Config;
use selfsync_types::{Error, Result, SyncRequest, SyncTransport, TransportReply};
use std::time::Duration;
use tracing::{debug, info};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Sync endpoint URL
    pub url: String,
    /// Bearer token
    pub api_key: String,
    /// Overall request timeout (none = no timeout)
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a configuration without a timeout
    pub fn new<U: Into<String>, K: Into<String>>(url: U, api_key: K) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            request_timeout: None,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl TryFrom<&Config> for ClientConfig {
    type Error = Error;

    fn try_from(config: &Config) -> Result<Self> {
        Ok(Self {
            url: config.server.url.clone(),
            api_key: config.api_key()?.to_string(),
            request_timeout: config.server.request_timeout(),
        })
    }
}

/// Sync transport over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: ClientConfig,
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a transport from the `server` section of a configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(ClientConfig::try_from(config)?)
    }

    /// Get the configured endpoint
    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn exchange(&self, request: &SyncRequest) -> Result<TransportReply> {
        let form = build_form(request)?;
        info!("Sending sync request to {}", self.config.url);

        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Request to {} failed: {}", self.config.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http_status(status.as_u16()));
        }

        let deleted_files_header = response
            .headers()
            .get(DELETED_FILES_HEADER)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response body: {}", e)))?
            .to_vec();

        debug!(
            "Received {} bytes, Deleted-Files: {:?}",
            body.len(),
            deleted_files_header
        );

        Ok(TransportReply {
            body,
            deleted_files_header,
        })
    }
}
