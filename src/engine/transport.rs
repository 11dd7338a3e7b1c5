//! HTTP transport used for health probes, classifier calls and the container
//! engine API.
//!
//! The engine only needs a status code and a body, so the transport hides
//! reqwest behind a small trait that tests can script.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::error::{GatewayError, GatewayResult};

/// Status code and raw body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A 200 reply carrying the given JSON document.
    pub fn json(value: serde_json::Value) -> Self {
        Self::new(200, value.to_string())
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Failure below the HTTP layer: no response was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Minimal HTTP client contract.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET with the given timeout.
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, TransportError>;

    /// Issue a POST, with a JSON body if one is given.
    async fn post(
        &self,
        url: &str,
        body: Option<&serde_json::Value>,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> GatewayResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("sentinel-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> Result<HttpReply, TransportError> {
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpReply::new(status, body.to_vec()))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, TransportError> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        Self::read(response).await
    }

    async fn post(
        &self,
        url: &str,
        body: Option<&serde_json::Value>,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        let mut request = self.client.post(url).timeout(timeout);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::read(response).await
    }
}
