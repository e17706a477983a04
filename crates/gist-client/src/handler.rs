//! Handler pipeline
//!
//! Requests pass through an explicit, ordered list of [`Stage`]s and end at
//! exactly one terminal [`Handler`]:
//!
//! ```text
//! GistApi → [LoggingStage] → [RecordingStage | ReplayingStage] → terminal
//!                                                                 ├─ ReqwestTransport (record)
//!                                                                 └─ FailingTransport (replay)
//! ```
//!
//! The pipeline is composed once at setup. [`Pipeline::describe`] shows the
//! active composition and [`Pipeline::dispatch`] reports which stage or
//! terminal produced each response.

use crate::error::TransportError;
use async_trait::async_trait;
use gist_traffic::{HttpRequest, HttpResponse};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// BoxFuture type alias for stage handlers
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that turns a request into a response
///
/// Implemented by transports and by [`Pipeline`] itself, so calling code
/// does not know whether it talks to the network or to fixtures.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Short name used in logs and in [`Handled::handled_by`]
    fn name(&self) -> &'static str;

    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// What a stage contributes to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Archives interactions that pass through
    Record,
    /// Answers from archived interactions
    Replay,
    /// Looks at traffic without changing it
    Observe,
}

/// A response plus the name of whoever produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handled {
    pub response: HttpResponse,
    pub handled_by: &'static str,
}

/// Middleware stage
///
/// A stage either answers the request itself or forwards it with
/// [`Next::run`]. Stages must not retry.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn capability(&self) -> Capability;

    fn handle<'a>(
        &'a self,
        request: HttpRequest,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Handled, TransportError>>;
}

/// The remainder of a pipeline, from a stage's point of view
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    terminal: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Forward `request` to the next stage, or to the terminal
    pub fn run(self, request: HttpRequest) -> BoxFuture<'a, Result<Handled, TransportError>> {
        Box::pin(async move {
            match self.stages.split_first() {
                Some((stage, rest)) => {
                    let next = Next {
                        stages: rest,
                        terminal: self.terminal,
                    };
                    stage.handle(request, next).await
                }
                None => {
                    let response = self.terminal.handle(request).await?;
                    Ok(Handled {
                        response,
                        handled_by: self.terminal.name(),
                    })
                }
            }
        })
    }
}

/// Stages composed in front of a terminal handler
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    terminal: Arc<dyn Handler>,
}

impl Pipeline {
    pub fn builder(terminal: impl Handler + 'static) -> PipelineBuilder {
        PipelineBuilder {
            stages: Vec::new(),
            terminal: Arc::new(terminal),
        }
    }

    /// Stage names in call order, then the terminal
    pub fn describe(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(self.terminal.name()))
            .collect()
    }

    /// Capabilities of the stages in call order
    pub fn capabilities(&self) -> Vec<Capability> {
        self.stages.iter().map(|s| s.capability()).collect()
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.stages.iter().any(|s| s.capability() == capability)
    }

    /// Send `request` through every stage
    pub async fn dispatch(&self, request: HttpRequest) -> Result<Handled, TransportError> {
        let next = Next {
            stages: &self.stages,
            terminal: self.terminal.as_ref(),
        };
        next.run(request).await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pipeline").field(&self.describe()).finish()
    }
}

#[async_trait]
impl Handler for Pipeline {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.dispatch(request).await.map(|handled| handled.response)
    }
}

/// Builder for [`Pipeline`]; the first stage added is the outermost
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Stage>>,
    terminal: Arc<dyn Handler>,
}

impl PipelineBuilder {
    #[must_use]
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
            terminal: self.terminal,
        }
    }
}

/// Logs every exchange at debug level
///
/// Only method, path, status and the handling stage are logged; headers
/// (and with them credentials) never are.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingStage;

impl Stage for LoggingStage {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn capability(&self) -> Capability {
        Capability::Observe
    }

    fn handle<'a>(
        &'a self,
        request: HttpRequest,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Handled, TransportError>> {
        Box::pin(async move {
            let method = request.method.clone();
            let path = request.path.clone();
            log::debug!("--> {} {}", method, path);

            let result = next.run(request).await;
            match &result {
                Ok(handled) => log::debug!(
                    "<-- {} {} {} (handled by {})",
                    handled.response.status,
                    method,
                    path,
                    handled.handled_by
                ),
                Err(e) => log::debug!("<-- {} {} failed: {}", method, path, e),
            }
            result
        })
    }
}
