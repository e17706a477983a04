//! Recording stage (decorator over the live transport)
//!
//! Forwards each request exactly once and archives the sanitized
//! interaction. The caller gets the original, unsanitized response, so
//! recording is observationally transparent.

use crate::error::TransportError;
use crate::handler::{BoxFuture, Capability, Handled, Next, Stage};
use gist_traffic::{HttpRequest, TrafficCache};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RecordingStage {
    cache: Arc<TrafficCache>,
}

impl RecordingStage {
    pub fn new(cache: Arc<TrafficCache>) -> Self {
        Self { cache }
    }
}

impl Stage for RecordingStage {
    fn name(&self) -> &'static str {
        "record"
    }

    fn capability(&self) -> Capability {
        Capability::Record
    }

    fn handle<'a>(
        &'a self,
        request: HttpRequest,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Handled, TransportError>> {
        Box::pin(async move {
            // Transport errors propagate as they are; nothing is archived
            let handled = next.run(request.clone()).await?;

            // File I/O and the store lock may block
            let cache = Arc::clone(&self.cache);
            let response = handled.response.clone();
            tokio::task::spawn_blocking(move || cache.set(&request, &response)).await??;
            Ok(handled)
        })
    }
}
