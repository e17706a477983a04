//! Terminal handlers
//!
//! [`ReqwestTransport`] talks to the live service. [`FailingTransport`] is
//! the end of the replay pipeline: it performs no I/O and rejects every
//! request that reaches it.

use crate::error::TransportError;
use crate::handler::Handler;
use async_trait::async_trait;
use gist_traffic::{fingerprint, HttpRequest, HttpResponse};
use log::{debug, warn};
use reqwest::Client as HttpClient;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Live HTTP transport
///
/// Request paths are resolved against `base_url`. Timeouts and connection
/// failures surface as [`TransportError::Network`]; there are no retries.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: String,
    http: HttpClient,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(TransportError::InvalidRequest(format!(
                "base URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Handler for ReqwestTransport {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            TransportError::InvalidRequest(format!("invalid HTTP method: {}", request.method))
        })?;
        let url = self.url(&request.path);
        debug!("Sending {} {}", method, url);

        let mut builder = self.http.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.body(request.body).send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Replay-mode fallback: fails deterministically, never touches the network
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingTransport;

#[async_trait]
impl Handler for FailingTransport {
    fn name(&self) -> &'static str {
        "no-recorded-response"
    }

    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let fingerprint = fingerprint(&request);
        warn!(
            "No recorded response for {} {} (fingerprint {})",
            request.method, request.path, fingerprint
        );
        Err(TransportError::NoRecordedResponse {
            method: request.method,
            path: request.path,
            fingerprint,
        })
    }
}
