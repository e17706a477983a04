//! Record/replay wiring
//!
//! Exactly two compositions exist:
//!
//! | Mode   | Stages                     | Terminal             | Token            |
//! |--------|----------------------------|----------------------|------------------|
//! | record | `logging`, `record`        | `ReqwestTransport`   | live, required   |
//! | replay | `logging`, `replay`        | `FailingTransport`   | `dummy-token`    |
//!
//! Test code builds a [`Harness`] from a [`HarnessConfig`] and only ever
//! touches [`Harness::api`] and [`Harness::token`], so the same test body
//! runs unchanged in both modes.

use crate::api::GistApi;
use crate::handler::{Handler, LoggingStage, Pipeline};
use crate::recording::RecordingStage;
use crate::replaying::ReplayingStage;
use crate::transport::{FailingTransport, ReqwestTransport};
use anyhow::{Context, Result};
use gist_harness_config::{HarnessConfig, TrafficMode};
use gist_traffic::{TrafficCache, PLACEHOLDER_TOKEN};
use log::info;
use std::fmt;
use std::sync::Arc;

/// A ready-to-use API client plus the pipeline behind it
#[derive(Clone)]
pub struct Harness {
    mode: TrafficMode,
    token: String,
    cache: Arc<TrafficCache>,
    pipeline: Arc<Pipeline>,
    api: GistApi,
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("mode", &self.mode)
            .field("token", &"<redacted>")
            .field("fixtures_dir", &self.cache.dir())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl Harness {
    /// Compose the pipeline selected by `config.mode`
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let cache = Arc::new(
            TrafficCache::open(&config.fixtures_dir).with_context(|| {
                format!(
                    "Failed to open fixture store {}",
                    config.fixtures_dir.display()
                )
            })?,
        );

        match config.mode {
            TrafficMode::Record => {
                let token = config.live_token()?.to_string();
                let transport = ReqwestTransport::with_timeout(&config.base_url, config.timeout())
                    .context("Failed to create live transport")?;
                Ok(Self::record(cache, transport, token))
            }
            TrafficMode::Replay => Ok(Self::replay(cache)),
        }
    }

    /// Record mode over any live handler
    pub fn record(
        cache: Arc<TrafficCache>,
        transport: impl Handler + 'static,
        token: impl Into<String>,
    ) -> Self {
        let pipeline = Pipeline::builder(transport)
            .stage(LoggingStage)
            .stage(RecordingStage::new(Arc::clone(&cache)))
            .build();
        Self::assemble(TrafficMode::Record, token.into(), cache, pipeline)
    }

    /// Replay mode; never performs network I/O
    pub fn replay(cache: Arc<TrafficCache>) -> Self {
        let pipeline = Pipeline::builder(FailingTransport)
            .stage(LoggingStage)
            .stage(ReplayingStage::new(Arc::clone(&cache)))
            .build();
        Self::assemble(
            TrafficMode::Replay,
            PLACEHOLDER_TOKEN.to_string(),
            cache,
            pipeline,
        )
    }

    fn assemble(
        mode: TrafficMode,
        token: String,
        cache: Arc<TrafficCache>,
        pipeline: Pipeline,
    ) -> Self {
        let pipeline = Arc::new(pipeline);
        info!(
            "Gist harness in {} mode: {}",
            mode,
            pipeline.describe().join(" -> ")
        );
        let api = GistApi::new(pipeline.clone());
        Self {
            mode,
            token,
            cache,
            pipeline,
            api,
        }
    }

    pub fn api(&self) -> &GistApi {
        &self.api
    }

    /// Token to pass to authenticated operations
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn mode(&self) -> TrafficMode {
        self.mode
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn cache(&self) -> &TrafficCache {
        &self.cache
    }
}
