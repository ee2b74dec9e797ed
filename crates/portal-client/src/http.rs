//! HTTP transport used by the portal clients.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use wms_common::{WmsError, WmsResult};

use crate::config::PortalConfig;

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Canonical reason phrase, when known
    pub reason: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: None,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `Err(WmsError::HttpStatus)` unless the status is 2xx.
    pub fn error_for_status(self) -> WmsResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(WmsError::http_status(self.status, self.reason.as_deref()))
        }
    }
}

/// Issues GET requests. Non-2xx statuses are returned, not raised.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: &str) -> WmsResult<HttpResponse>;
}

/// `HttpFetch` backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestFetch {
    client: Client,
}

impl ReqwestFetch {
    pub fn new(timeout: Duration) -> WmsResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WmsError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn from_config(config: &PortalConfig) -> WmsResult<Self> {
        Self::new(config.request_timeout())
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &str) -> WmsResult<HttpResponse> {
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        debug!(status = status.as_u16(), bytes = body.len(), "Received response");

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            body,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> WmsError {
    if e.is_timeout() {
        WmsError::Timeout
    } else {
        WmsError::Transport(e.to_string())
    }
}
