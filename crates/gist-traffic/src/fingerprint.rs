//! Canonical request fingerprints
//!
//! A fingerprint is the SHA-256 of a canonical text form of the sanitized
//! request:
//!
//! ```text
//! METHOD SP path LF
//! name ":" value LF        (one per non-volatile header, lower-cased name, sorted)
//! LF
//! body bytes
//! ```
//!
//! Header order and name casing do not matter; volatile headers and the real
//! credential cannot influence the key.

use crate::http::HttpRequest;
use crate::sanitize::{is_volatile_header, sanitize_request};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Lower-case hex SHA-256 identifying one logical request
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a fingerprint from its hex form (e.g. a fixture file stem)
    pub fn parse(hex_digest: &str) -> Option<Self> {
        let valid = hex_digest.len() == 64
            && hex_digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(hex_digest.to_string()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint of `request` after sanitization
pub fn fingerprint(request: &HttpRequest) -> Fingerprint {
    let sanitized = sanitize_request(request);

    let mut headers: Vec<(String, &str)> = sanitized
        .headers
        .iter()
        .filter(|(name, _)| !is_volatile_header(name))
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
        .collect();
    // Stable: repeated headers keep their relative order
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    hasher.update(sanitized.method.to_ascii_uppercase().as_bytes());
    hasher.update(b" ");
    hasher.update(sanitized.path.as_bytes());
    hasher.update(b"\n");
    for (name, value) in &headers {
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(b"\n");
    hasher.update(&sanitized.body);

    Fingerprint(hex::encode(hasher.finalize()))
}
