//! Gist API data transfer objects
//!
//! `files` is a `BTreeMap` so that request bodies serialize in a stable
//! order; identical intents therefore produce identical fingerprints.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A gist, either as intended by the caller or as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gist {
    /// Server-assigned id, absent until created
    #[serde(default)]
    pub id: Option<String>,

    /// Free text; the service reports `null` as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,

    /// Filename -> file
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,

    #[serde(default)]
    pub public: bool,

    /// Browser URL, absent until created
    #[serde(default)]
    pub html_url: Option<String>,
}

impl Gist {
    pub fn new(description: impl Into<String>, public: bool) -> Self {
        Self {
            description: description.into(),
            public,
            ..Self::default()
        }
    }

    /// Add or replace a file (builder style)
    #[must_use]
    pub fn with_file(mut self, filename: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(filename.into(), GistFile::new(content));
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Copy the server-assigned fields from `other`
    #[must_use]
    pub fn with_server_fields(mut self, other: &Gist) -> Self {
        self.id = other.id.clone();
        self.html_url = other.html_url.clone();
        self
    }

    /// Drop the server-assigned fields
    #[must_use]
    pub fn without_server_fields(mut self) -> Self {
        self.id = None;
        self.html_url = None;
        self
    }

    /// Equal once server-assigned fields are ignored
    pub fn same_intent(&self, other: &Gist) -> bool {
        self.description == other.description
            && self.files == other.files
            && self.public == other.public
    }

    pub fn file(&self, filename: &str) -> Option<&GistFile> {
        self.files.get(filename)
    }
}

/// A file in a gist; the name is its key in [`Gist::files`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistFile {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

impl GistFile {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// One revision in a gist's history
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GistCommit {
    /// Opaque revision id (a commit SHA)
    pub version: String,
}

impl GistCommit {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
