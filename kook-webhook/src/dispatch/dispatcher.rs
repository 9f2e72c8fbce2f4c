//! Fire-and-forget fan-out of events to their handlers.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use super::registry::{HandlerFn, HandlerRegistry};
use crate::error::WebhookError;
use crate::signal::Event;

/// What a dispatch did: the event type matched and the tasks spawned for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub event_type: i32,
    pub handlers: usize,
}

/// Spawns one task per matching handler and returns without waiting.
#[derive(Clone)]
pub struct Dispatcher {
    registry: HandlerRegistry,
    limit: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    /// Create a dispatcher over `registry`.
    ///
    /// `max_concurrent_handlers` bounds how many handler tasks run at once
    /// across all requests; 0 means unbounded. Tasks over the bound wait
    /// for a permit inside their own task, never in the request path.
    pub fn new(registry: HandlerRegistry, max_concurrent_handlers: usize) -> Self {
        let limit = (max_concurrent_handlers > 0)
            .then(|| Arc::new(Semaphore::new(max_concurrent_handlers)));
        Self { registry, limit }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Parse `data` as an event and spawn its handlers.
    ///
    /// Reports how many handler tasks were spawned. Completion is never
    /// reported back; a failing or panicking handler is logged and affects
    /// nothing else.
    pub async fn dispatch(&self, data: &str) -> Result<DispatchReport, WebhookError> {
        let event: Event = serde_json::from_str(data).map_err(WebhookError::MalformedEvent)?;

        debug!(
            event_type = event.event_type,
            msg_id = %event.msg_id,
            content_length = event.content.len(),
            "webhook_event_parsed"
        );

        let event_type = event.event_type;
        let handlers = self.registry.snapshot(event_type).await;
        if handlers.is_empty() {
            debug!(event_type, "webhook_event_unhandled");
            return Ok(DispatchReport { event_type, handlers: 0 });
        }

        let event = Arc::new(event);
        let spawned = handlers.len();

        for (index, handler) in handlers.into_iter().enumerate() {
            let event = Arc::clone(&event);
            let limit = self.limit.clone();

            tokio::spawn(async move {
                let _permit = match limit {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => {
                            warn!(event_type = event.event_type, index, "handler_limit_closed");
                            return;
                        }
                    },
                    None => None,
                };

                run_handler(handler, event, index).await;
            });
        }

        debug!(event_type, handlers = spawned, "webhook_event_dispatched");

        Ok(DispatchReport { event_type, handlers: spawned })
    }
}

/// Run one handler behind a panic boundary, logging any failure.
async fn run_handler(handler: HandlerFn, event: Arc<Event>, index: usize) {
    let event_type = event.event_type;
    let msg_id = event.msg_id.clone();

    let result = AssertUnwindSafe(async move { handler(event).await })
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(())) => {
            debug!(event_type, index, msg_id = %msg_id, "handler_completed");
        }
        Ok(Err(e)) => {
            error!(event_type, index, msg_id = %msg_id, error = %e, "handler_failed");
        }
        Err(panic_info) => {
            let panic_msg = panic_info
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| panic_info.downcast_ref::<&str>().copied())
                .unwrap_or("unknown panic");

            error!(event_type, index, msg_id = %msg_id, error = panic_msg, "handler_panicked");
        }
    }
}
