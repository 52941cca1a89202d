//! HTTP transport for tool servers that expose a JSON-RPC endpoint.

use crate::error::ToolsetError;
use crate::protocol::{RpcRequest, RpcResponse};
use crate::transport::ToolTransport;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// JSON-RPC over HTTP POST.
///
/// Headers configured at build time ride on every request; per-call
/// headers (authorization, project attribution) are merged in at exchange
/// time and win on collision.
pub struct HttpToolTransport {
    /// Where requests are POSTed
    url: String,
    /// Client carrying the configured timeout
    client: reqwest::Client,
    /// Headers sent with every request
    base_headers: HashMap<String, String>,
}

impl HttpToolTransport {
    /// Start building a transport for the given endpoint.
    pub fn new(url: impl Into<String>) -> HttpToolTransportBuilder {
        HttpToolTransportBuilder::new(url)
    }

    /// The endpoint this transport talks to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Builder for [`HttpToolTransport`].
pub struct HttpToolTransportBuilder {
    url: String,
    base_headers: HashMap<String, String>,
    timeout: Duration,
}

impl HttpToolTransportBuilder {
    /// Builder with a 30 second timeout and no extra headers.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            base_headers: HashMap::new(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Send this header with every request.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.base_headers.insert(key.into(), value.into());
        self
    }

    /// Send all of these headers with every request.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.base_headers.extend(headers);
        self
    }

    /// Overall per-request timeout, in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Build the transport, or fail if the underlying client cannot be set up.
    pub fn build(self) -> Result<HttpToolTransport, ToolsetError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ToolsetError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(HttpToolTransport {
            url: self.url,
            client,
            base_headers: self.base_headers,
        })
    }
}

#[async_trait]
impl ToolTransport for HttpToolTransport {
    async fn exchange(
        &self,
        request: RpcRequest,
        headers: &HashMap<String, String>,
    ) -> Result<RpcResponse, ToolsetError> {
        tracing::debug!(url = %self.url, method = %request.method, "tool rpc over http");

        let mut merged = self.base_headers.clone();
        for (key, value) in headers {
            merged.insert(key.clone(), value.clone());
        }

        let mut outbound = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        for (key, value) in &merged {
            outbound = outbound.header(key, value);
        }

        let reply = outbound
            .json(&request)
            .send()
            .await
            .map_err(|e| ToolsetError::transport(format!("HTTP request failed: {}", e)))?;

        let status = reply.status();
        if !status.is_success() {
            let body = reply.text().await.unwrap_or_default();
            return Err(ToolsetError::transport(format!(
                "HTTP error {}: {}",
                status, body
            )));
        }

        let body = reply
            .text()
            .await
            .map_err(|e| ToolsetError::transport(format!("Failed to read response: {}", e)))?;
        tracing::debug!(url = %self.url, "tool rpc response: {}", body);

        Ok(serde_json::from_str(&body)?)
    }
}

impl std::fmt::Debug for HttpToolTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Header values may carry credentials; only the keys are shown.
        f.debug_struct("HttpToolTransport")
            .field("url", &self.url)
            .field("headers", &self.base_headers.keys().collect::<Vec<_>>())
            .finish()
    }
}
