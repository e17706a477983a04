//! Transport-neutral HTTP values
//!
//! `HttpRequest` and `HttpResponse` are what flows through a handler pipeline
//! and what gets archived as a fixture. They carry no connection state and
//! compare by value. Header names keep their original spelling but every
//! lookup is case-insensitive.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Ordered list of `(name, value)` header pairs; duplicates are allowed
pub type Headers = Vec<(String, String)>;

/// An outbound request, addressed relative to the API base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// HTTP verb, e.g. "GET"
    pub method: String,

    /// Path and query, e.g. "/gists/abc/commits"
    pub path: String,

    #[serde(default)]
    pub headers: Headers,

    #[serde(default, with = "stored_body")]
    pub body: Bytes,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new("PATCH", path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new("DELETE", path)
    }

    /// Append a header (builder style)
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body with raw bytes
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the JSON body and set `Content-Type`
    pub fn json_body<T: Serialize + ?Sized>(self, value: &T) -> serde_json::Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }

    /// First value of the named header
    pub fn header_value(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }
}

/// A response as returned by a transport or replayed from a fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,

    #[serde(default)]
    pub headers: Headers,

    #[serde(default, with = "stored_body")]
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, with invalid UTF-8 replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

pub(crate) fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Body encoding for fixtures
///
/// UTF-8 bodies are stored as plain text so fixtures stay reviewable;
/// anything else is stored as base64. Both decode to the exact original bytes.
mod stored_body {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    enum StoredBody {
        Text(String),
        Base64(String),
    }

    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        let stored = match std::str::from_utf8(body) {
            Ok(text) => StoredBody::Text(text.to_string()),
            Err(_) => StoredBody::Base64(BASE64.encode(body)),
        };
        stored.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        match StoredBody::deserialize(deserializer)? {
            StoredBody::Text(text) => Ok(Bytes::from(text)),
            StoredBody::Base64(encoded) => BASE64
                .decode(encoded.as_bytes())
                .map(Bytes::from)
                .map_err(serde::de::Error::custom),
        }
    }
}
