//! Harness configuration
//!
//! Settings come from `.gist-harness.toml` (see [`crate::load_config_file`]),
//! then environment variables override them:
//!
//! | Variable             | Field          |
//! |----------------------|----------------|
//! | `GIST_TRAFFIC_MODE`  | `mode`         |
//! | `GIST_FIXTURES_DIR`  | `fixtures_dir` |
//! | `GIST_API_BASE_URL`  | `base_url`     |
//! | `GIST_API_TOKEN`     | token          |
//!
//! The token is never read from the file and never printed.

use crate::{TrafficMode, DEFAULT_BASE_URL, DEFAULT_FIXTURES_DIR};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const MODE_VAR: &str = "GIST_TRAFFIC_MODE";
pub const FIXTURES_DIR_VAR: &str = "GIST_FIXTURES_DIR";
pub const BASE_URL_VAR: &str = "GIST_API_BASE_URL";
pub const TOKEN_VAR: &str = "GIST_API_TOKEN";

/// Configuration for one harness instance
#[derive(Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub mode: TrafficMode,

    /// Directory holding the fixture store
    #[serde(default = "default_fixtures_dir")]
    pub fixtures_dir: PathBuf,

    /// Base URL of the live service (record mode only)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout for the live transport
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Live credential, supplied out-of-band
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_fixtures_dir() -> PathBuf {
    PathBuf::from(DEFAULT_FIXTURES_DIR)
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            mode: TrafficMode::default(),
            fixtures_dir: default_fixtures_dir(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            token: None,
        }
    }
}

impl fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("mode", &self.mode)
            .field("fixtures_dir", &self.fixtures_dir)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HarnessConfig {
    /// Config for a given mode and fixture store, everything else default
    pub fn new(mode: TrafficMode, fixtures_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            fixtures_dir: fixtures_dir.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Parse the TOML form; missing keys use defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse harness config")
    }

    /// Load from config file, `.env` and the process environment
    pub fn load() -> Result<Self> {
        let config = match crate::load_config_file() {
            Some(content) => Self::from_toml(&content)?,
            None => {
                log::debug!("No harness config file, using defaults");
                Self::default()
            }
        };

        if std::env::var(TOKEN_VAR).is_err() {
            match dotenvy::dotenv() {
                Ok(path) => log::debug!("Loaded .env file from: {:?}", path),
                Err(_) => log::debug!(".env file not found, relying on environment variables"),
            }
        }

        config.with_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an environment lookup
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(MODE_VAR) {
            self.mode = mode
                .parse()
                .with_context(|| format!("Invalid {}", MODE_VAR))?;
        }
        if let Some(dir) = lookup(FIXTURES_DIR_VAR) {
            self.fixtures_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup(BASE_URL_VAR) {
            self.base_url = url;
        }
        if let Some(token) = lookup(TOKEN_VAR).filter(|t| !t.trim().is_empty()) {
            self.token = Some(token);
        }
        log::debug!("Harness config: {:?}", self);
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The live credential; required in record mode
    pub fn live_token(&self) -> Result<&str> {
        self.token.as_deref().with_context(|| {
            format!(
                "Recording needs a live token. Set {} (or add it to .env)",
                TOKEN_VAR
            )
        })
    }
}
