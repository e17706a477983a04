//! Replaying stage (decorator over the failing stub)
//!
//! Answers from the fixture store. On a miss the request goes to the next
//! handler, which in replay mode is always [`crate::FailingTransport`], so a
//! replayed run either succeeds from fixtures or fails loudly without any
//! network I/O.

use crate::error::TransportError;
use crate::handler::{BoxFuture, Capability, Handled, Next, Stage};
use gist_traffic::{HttpRequest, TrafficCache};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ReplayingStage {
    cache: Arc<TrafficCache>,
}

impl ReplayingStage {
    pub fn new(cache: Arc<TrafficCache>) -> Self {
        Self { cache }
    }
}

impl Stage for ReplayingStage {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn capability(&self) -> Capability {
        Capability::Replay
    }

    fn handle<'a>(
        &'a self,
        request: HttpRequest,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Handled, TransportError>> {
        Box::pin(async move {
            let cache = Arc::clone(&self.cache);
            let lookup = request.clone();
            let recorded = tokio::task::spawn_blocking(move || cache.get(&lookup)).await??;
            if let Some(response) = recorded {
                return Ok(Handled {
                    response,
                    handled_by: self.name(),
                });
            }
            next.run(request).await
        })
    }
}
