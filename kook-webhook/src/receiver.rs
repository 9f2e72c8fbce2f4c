//! The inbound request pipeline, independent of any HTTP framework.
//!
//! ```text
//! body → decode_body → maybe_decrypt → parse_envelope → classify
//!      ├─ Challenge           → echo challenge
//!      ├─ Event  → authenticate → dispatch (fire-and-forget)
//!      └─ Ignored             → ack
//! ```
//!
//! The body is fully decoded and decrypted before any field is inspected.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info};

use crate::codec::{decode_body, maybe_decrypt};
use crate::config::{Config, DEFAULT_MAX_BODY_BYTES};
use crate::dispatch::{DispatchReport, Dispatcher, HandlerRegistry, HandlerResult};
use crate::error::WebhookError;
use crate::signal::{authenticate, classify, parse_envelope, Event, Signal};

/// Terminal state of one successfully handled request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Verification handshake; respond with the challenge.
    Challenge(String),
    /// Authenticated event, handed to its handlers.
    Dispatched(DispatchReport),
    /// Non-event signal kind, acknowledged and dropped.
    Ignored(i32),
}

/// Decodes, verifies and dispatches webhook bodies.
#[derive(Clone)]
pub struct WebhookReceiver {
    encrypt_key: Option<Arc<str>>,
    verify_token: Option<Arc<str>>,
    max_body_bytes: usize,
    dispatcher: Dispatcher,
}

impl WebhookReceiver {
    /// Build a receiver from configuration around an existing registry.
    pub fn new(config: &Config, registry: HandlerRegistry) -> Self {
        Self::with_secrets(
            config.encrypt_key.as_deref(),
            config.verify_token.as_deref(),
            registry,
            config.handler_concurrency,
        )
        .with_body_limit(config.max_body_bytes)
    }

    /// Build a receiver from explicit secrets. Empty strings count as unset.
    pub fn with_secrets(
        encrypt_key: Option<&str>,
        verify_token: Option<&str>,
        registry: HandlerRegistry,
        handler_concurrency: usize,
    ) -> Self {
        Self {
            encrypt_key: encrypt_key.filter(|k| !k.is_empty()).map(Arc::from),
            verify_token: verify_token.filter(|t| !t.is_empty()).map(Arc::from),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            dispatcher: Dispatcher::new(registry, handler_concurrency),
        }
    }

    /// Cap the size of the body after transport decoding.
    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        self.dispatcher.registry()
    }

    /// Register a handler for `event_type`. Shorthand for `registry().register`.
    pub async fn on_event<F, Fut>(&self, event_type: i32, handler: F)
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry().register(event_type, handler).await;
    }

    /// Run one request body through the pipeline.
    pub async fn receive(
        &self,
        body: &[u8],
        content_encoding: &str,
    ) -> Result<Outcome, WebhookError> {
        let body = decode_body(body, content_encoding, self.max_body_bytes)?;
        let body = maybe_decrypt(body, self.encrypt_key.as_deref())?;

        debug!(body = %String::from_utf8_lossy(&body), "webhook_body_decoded");

        let envelope = parse_envelope(&body)?;

        match classify(&envelope)? {
            Signal::Challenge(challenge) => {
                info!(sequence = envelope.sequence, "webhook_challenge");
                Ok(Outcome::Challenge(challenge))
            }
            Signal::Event(meta) => {
                authenticate(&meta, self.verify_token.as_deref())?;
                let report = self.dispatcher.dispatch(envelope.data_json()).await?;

                info!(
                    sequence = envelope.sequence,
                    event_type = report.event_type,
                    handlers = report.handlers,
                    "webhook_event_accepted"
                );
                Ok(Outcome::Dispatched(report))
            }
            Signal::Ignored(kind) => {
                info!(signal_kind = kind, sequence = envelope.sequence, "webhook_signal_ignored");
                Ok(Outcome::Ignored(kind))
            }
        }
    }
}
