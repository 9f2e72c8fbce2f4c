//! KOOK push-event webhook receiver.
//!
//! Accepts signed and optionally encrypted HTTP callbacks, recovers the
//! event, checks its verify token and fans it out to registered handlers.
//!
//! ## Pipeline
//!
//! ```text
//! HTTP POST → decode_body → maybe_decrypt → classify ─┬→ challenge echo
//!                                                     ├→ authenticate → dispatch → handler tasks
//!                                                     └→ ignored signal
//! ```
//!
//! Handlers are registered on a [`HandlerRegistry`] that is passed to the
//! [`WebhookReceiver`]; there is no global state.

pub mod api;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod receiver;
pub mod signal;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use dispatch::{DispatchReport, Dispatcher, HandlerFn, HandlerRegistry, HandlerResult};
pub use error::WebhookError;
pub use receiver::{Outcome, WebhookReceiver};
pub use signal::{event_type, Event};
pub use web::{router, AppState};
