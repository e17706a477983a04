//! Configuration for the gist record/replay harness
//!
//! This crate provides:
//! - [`TrafficMode`]: whether a run records live traffic or replays fixtures
//! - Configuration file loading (TOML, CWD first, then home directory)
//! - [`HarnessConfig`]: file settings merged with `.env` and environment overrides

pub mod config_file;
pub mod harness_config;
pub mod mode;

pub use config_file::load_config_file;
pub use harness_config::HarnessConfig;
pub use mode::TrafficMode;

/// Public GitHub REST API
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Fixture store location, relative to the crate running the tests
pub const DEFAULT_FIXTURES_DIR: &str = "tests/recorded_traffic";
