//! Handler registry: event type → ordered handler list.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::RwLock;
use tracing::info;

use crate::signal::Event;

/// Outcome of one handler invocation.
pub type HandlerResult = anyhow::Result<()>;

/// A registered event handler.
///
/// Handlers receive a shared, read-only event: every handler registered
/// for a type sees the same instance.
pub type HandlerFn = Arc<dyn Fn(Arc<Event>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Registered handlers, shared between the setup code and every request.
///
/// Registration takes the write lock; dispatch takes the read lock only
/// long enough to copy the handler list.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<RwLock<HashMap<i32, Vec<HandlerFn>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `event_type`.
    pub async fn register<F, Fut>(&self, event_type: i32, handler: F)
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let wrapped: HandlerFn = Arc::new(move |event| handler(event).boxed());

        let mut handlers = self.handlers.write().await;
        let list = handlers.entry(event_type).or_default();
        list.push(wrapped);

        info!(event_type, handler_count = list.len(), "handler_registered");
    }

    /// Copy of the handlers for `event_type`, in registration order.
    pub async fn snapshot(&self, event_type: i32) -> Vec<HandlerFn> {
        let handlers = self.handlers.read().await;
        handlers.get(&event_type).cloned().unwrap_or_default()
    }

    /// Number of handlers registered for `event_type`.
    pub async fn handler_count(&self, event_type: i32) -> usize {
        self.handlers
            .read()
            .await
            .get(&event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
