//! Web server module for the push webhook.
//!
//! This module provides a thin HTTP layer that:
//! - Accepts POSTed push events on the configured path
//! - Answers the verification handshake
//! - Hands authenticated events to the dispatcher and returns immediately

pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{health, webhook, AppState, HealthResponse, WebhookResponse};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let path = state.config.webhook_path.clone();
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route(&path, any(webhook))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
