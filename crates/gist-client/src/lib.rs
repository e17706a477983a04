//! GitHub Gist API client with record/replay support
//!
//! The client is built on a handler abstraction so that the transport can be
//! decorated without the calling code noticing. Two compositions exist: one
//! records live traffic into a fixture store, one serves exclusively from it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                    GistApi                        │
//! │  create / update / delete / get_gist              │
//! │  list_commits / get_gist_revision                 │
//! └──────────────────────────────────────────────────┘
//!                          │ HttpRequest
//!                          ▼
//! ┌──────────────────────────────────────────────────┐
//! │ Pipeline: [LoggingStage, Recording|Replaying]     │
//! └──────────────────────────────────────────────────┘
//!                          │
//!        ┌─────────────────┴─────────────────┐
//!        ▼                                   ▼
//! ┌─────────────────┐              ┌────────────────────┐
//! │ ReqwestTransport│              │ FailingTransport   │
//! │ (record mode)   │              │ (replay mode)      │
//! └─────────────────┘              └────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use gist_client::{Gist, Harness};
//! use gist_harness_config::HarnessConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let harness = Harness::from_config(&HarnessConfig::load()?)?;
//! let api = harness.api();
//!
//! let gist = Gist::new("test", false).with_file("test.txt", "some file content");
//! let created = api.create(&gist, harness.token()).await?;
//! api.delete(created.id.as_deref().unwrap_or_default(), harness.token()).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod handler;
pub mod harness;
pub mod recording;
pub mod replaying;
pub mod transport;
pub mod types;

pub use api::GistApi;
pub use error::{FailedRequest, GistError, Result, TransportError};
pub use handler::{BoxFuture, Capability, Handled, Handler, LoggingStage, Next, Pipeline, Stage};
pub use harness::Harness;
pub use recording::RecordingStage;
pub use replaying::ReplayingStage;
pub use transport::{FailingTransport, ReqwestTransport};
pub use types::{Gist, GistCommit, GistFile};

// Re-export the fixture layer so consumers don't need to depend on it directly
pub use gist_traffic;
