//! Redaction of credentials and run-to-run noise
//!
//! Both functions are pure and idempotent. Requests are sanitized before they
//! are fingerprinted or persisted, responses before they are persisted.

use crate::http::{HttpRequest, HttpResponse};

/// Value every persisted `Authorization` header carries
pub const PLACEHOLDER_AUTHORIZATION: &str = "Bearer dummy-token";

/// Token used wherever a token is needed while replaying
pub const PLACEHOLDER_TOKEN: &str = "dummy-token";

const VOLATILE_HEADERS: &[&str] = &["date", "etag", "last-modified"];
const VOLATILE_PREFIXES: &[&str] = &["github-", "x-"];

/// Headers that change between runs (timestamps, cache validators,
/// rate-limit counters, request ids)
pub fn is_volatile_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    VOLATILE_HEADERS.contains(&name.as_str())
        || VOLATILE_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Replace the `Authorization` value with the placeholder, if present
///
/// The first occurrence keeps its position; any further `Authorization`
/// headers are dropped. Everything else is untouched.
pub fn sanitize_request(request: &HttpRequest) -> HttpRequest {
    let mut sanitized = request.clone();
    let mut seen = false;
    sanitized.headers.retain_mut(|(name, value)| {
        if !name.eq_ignore_ascii_case("authorization") {
            return true;
        }
        if seen {
            return false;
        }
        seen = true;
        *value = PLACEHOLDER_AUTHORIZATION.to_string();
        true
    });
    sanitized
}

/// Drop volatile headers from a response
pub fn sanitize_response(response: &HttpResponse) -> HttpResponse {
    let mut sanitized = response.clone();
    sanitized
        .headers
        .retain(|(name, _)| !is_volatile_header(name));
    sanitized
}
