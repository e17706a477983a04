//! Gist REST operations
//!
//! `GistApi` builds requests, hands them to whatever [`Handler`] it was
//! given and maps the outcome to domain values. It does not know whether it
//! is talking to the live service or to fixtures.
//!
//! Lifecycle of a gist on the service side:
//!
//! ```text
//! non-existent ──create──▶ created ──update──▶ created (one more commit)
//!                              │
//!                              └──delete──▶ deleted (every further call fails)
//! ```

use crate::error::{FailedRequest, GistError, Result};
use crate::handler::Handler;
use crate::types::{Gist, GistCommit, GistFile};
use gist_traffic::{HttpRequest, HttpResponse};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("gist-client/", env!("CARGO_PKG_VERSION"));

/// Body of `POST /gists`
#[derive(Serialize)]
struct CreatePayload<'a> {
    description: &'a str,
    files: &'a BTreeMap<String, GistFile>,
    public: bool,
}

/// Body of `PATCH /gists/{id}`
#[derive(Serialize)]
struct UpdatePayload<'a> {
    description: &'a str,
    files: &'a BTreeMap<String, GistFile>,
}

/// Gist API client over an arbitrary handler
#[derive(Clone)]
pub struct GistApi {
    handler: Arc<dyn Handler>,
}

impl std::fmt::Debug for GistApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GistApi")
            .field("handler", &self.handler.name())
            .finish()
    }
}

impl GistApi {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    /// Create a gist; the returned gist carries the server-assigned id and URL
    ///
    /// The service rejects gists without files.
    pub async fn create(&self, gist: &Gist, token: &str) -> Result<Gist> {
        let request = Self::request("POST", "/gists".to_string(), Some(token)).json_body(
            &CreatePayload {
                description: &gist.description,
                files: &gist.files,
                public: gist.public,
            },
        );
        let response = self.send(Self::encoded(request)?).await?;
        let created: Gist = Self::decode(&response)?;
        debug!("Created gist {:?}", created.id);
        Ok(created)
    }

    /// Replace description and file contents; appends one commit
    pub async fn update(&self, gist: &Gist, token: &str) -> Result<Gist> {
        let id = gist
            .id
            .as_deref()
            .ok_or_else(|| FailedRequest::new(0, "cannot update a gist without id"))?;
        let request = Self::request("PATCH", format!("/gists/{}", id), Some(token)).json_body(
            &UpdatePayload {
                description: &gist.description,
                files: &gist.files,
            },
        );
        let response = self.send(Self::encoded(request)?).await?;
        Self::decode(&response)
    }

    /// Delete a gist; deleting it again fails
    pub async fn delete(&self, gist_id: &str, token: &str) -> Result<()> {
        let request = Self::request("DELETE", format!("/gists/{}", gist_id), Some(token));
        self.send(request).await?;
        debug!("Deleted gist {}", gist_id);
        Ok(())
    }

    /// Current state of a gist; public gists need no token
    pub async fn get_gist(&self, gist_id: &str, token: Option<&str>) -> Result<Gist> {
        let request = Self::request("GET", format!("/gists/{}", gist_id), token);
        let response = self.send(request).await?;
        Self::decode(&response)
    }

    /// Revisions of a gist, newest first
    pub async fn list_commits(&self, gist_id: &str) -> Result<Vec<GistCommit>> {
        let request = Self::request("GET", format!("/gists/{}/commits", gist_id), None);
        let response = self.send(request).await?;
        Self::decode(&response)
    }

    /// The gist as it was at `version`
    pub async fn get_gist_revision(&self, gist_id: &str, version: &str) -> Result<Gist> {
        let request = Self::request("GET", format!("/gists/{}/{}", gist_id, version), None);
        let response = self.send(request).await?;
        Self::decode(&response)
    }

    fn request(method: &str, path: String, token: Option<&str>) -> HttpRequest {
        let request = HttpRequest::new(method, path)
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT);
        match token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    fn encoded(request: serde_json::Result<HttpRequest>) -> Result<HttpRequest> {
        request.map_err(|e| FailedRequest::new(0, format!("failed to encode request: {}", e)).into())
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method.clone();
        let path = request.path.clone();
        let response = self.handler.handle(request).await?;
        if !response.is_success() {
            let failed = FailedRequest::from_response(&response);
            debug!("{} {} failed: {}", method, path, failed);
            return Err(GistError::FailedRequest(failed));
        }
        Ok(response)
    }

    fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
        serde_json::from_slice(&response.body).map_err(|e| {
            FailedRequest::new(response.status, format!("malformed response body: {}", e)).into()
        })
    }
}
