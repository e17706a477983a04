//! Record/replay fixtures for HTTP traffic
//!
//! This crate holds the transport-independent half of the record/replay
//! harness:
//!
//! - [`http`]: plain request/response values that flow through handlers
//! - [`sanitize`]: credential redaction and removal of volatile headers
//! - [`fingerprint`]: the canonical key a request is stored under
//! - [`cache`]: the on-disk fixture store
//!
//! # Example
//!
//! ```rust,no_run
//! use gist_traffic::{HttpRequest, HttpResponse, TrafficCache};
//!
//! # fn example() -> Result<(), gist_traffic::CacheError> {
//! let cache = TrafficCache::open("tests/recorded_traffic")?;
//! let request = HttpRequest::get("/gists/abc").header("Authorization", "Bearer secret");
//!
//! cache.set(&request, &HttpResponse::new(200).body("{}"))?;
//! assert!(cache.get(&request)?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod fingerprint;
pub mod http;
pub mod sanitize;

pub use cache::{CacheError, CacheStats, CachedInteraction, TrafficCache};
pub use fingerprint::{fingerprint, Fingerprint};
pub use http::{Headers, HttpRequest, HttpResponse};
pub use sanitize::{
    is_volatile_header, sanitize_request, sanitize_response, PLACEHOLDER_AUTHORIZATION,
    PLACEHOLDER_TOKEN,
};
