//! Error types for the gist client
//!
//! Every domain failure (not found, validation, authorization, server error)
//! is a [`FailedRequest`]; callers tell cases apart by its status and detail.
//! Problems below the domain layer are a [`TransportError`]. In particular a
//! replay miss is a transport error, so "fixture missing" never looks like
//! "service rejected the request".

use gist_traffic::{CacheError, Fingerprint, HttpResponse};
use thiserror::Error;

/// The service did not accept a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request failed with status {status}: {detail}")]
pub struct FailedRequest {
    /// HTTP status; 0 when the request could not be sent at all
    pub status: u16,
    pub detail: String,
}

impl FailedRequest {
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// Build from a non-2xx response
    ///
    /// Uses the `message` of a JSON error body when there is one, the raw
    /// body text otherwise.
    pub fn from_response(response: &HttpResponse) -> Self {
        let body = response.text();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| json["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| body.into_owned());
        Self::new(response.status, detail)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// A request could not be carried to (or back from) the service
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("no recorded response for request {method} {path} (fingerprint {fingerprint})")]
    NoRecordedResponse {
        method: String,
        path: String,
        fingerprint: Fingerprint,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("fixture store task failed: {0}")]
    StoreTask(#[from] tokio::task::JoinError),
}

/// Error surfaced by every [`crate::GistApi`] operation
#[derive(Debug, Error)]
pub enum GistError {
    #[error(transparent)]
    FailedRequest(#[from] FailedRequest),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl GistError {
    pub fn failed_request(&self) -> Option<&FailedRequest> {
        match self {
            GistError::FailedRequest(failed) => Some(failed),
            GistError::Transport(_) => None,
        }
    }

    /// True for a replay-mode cache miss
    pub fn is_missing_fixture(&self) -> bool {
        matches!(
            self,
            GistError::Transport(TransportError::NoRecordedResponse { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, GistError>;
