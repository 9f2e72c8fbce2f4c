//! Webhook endpoint handlers.
//!
//! The webhook handler only decodes, verifies and hands the event to the
//! dispatcher; handlers run in their own tasks after the response is sent.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_ENCODING, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::receiver::{Outcome, WebhookReceiver};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub receiver: WebhookReceiver,
}

impl AppState {
    pub fn new(config: Config, receiver: WebhookReceiver) -> Self {
        Self {
            config: Arc::new(config),
            receiver,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Push Webhook
// =============================================================================

/// Webhook response body.
///
/// Serializes as `{"challenge": ".."}`, `{"code": 0}` or
/// `{"code": <status>, "message": ".."}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WebhookResponse {
    Challenge { challenge: String },
    Ack { code: i32 },
    Error { code: u16, message: &'static str },
}

impl WebhookResponse {
    fn ack() -> Self {
        WebhookResponse::Ack { code: 0 }
    }

    fn error(status: StatusCode) -> (StatusCode, Json<Self>) {
        let message = match status {
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::METHOD_NOT_ALLOWED => "method not allowed",
            _ => "bad request",
        };
        (
            status,
            Json(WebhookResponse::Error {
                code: status.as_u16(),
                message,
            }),
        )
    }
}

/// Push webhook endpoint.
///
/// - 200 `{"challenge": ..}` for the verification handshake
/// - 200 `{"code": 0}` for accepted events and ignored signals
/// - 400 for undecodable, undecryptable or malformed bodies
/// - 401 for a verify token mismatch
/// - 405 for anything but POST
pub async fn webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if method != Method::POST {
        warn!(method = %method, "webhook_method_not_allowed");
        return WebhookResponse::error(StatusCode::METHOD_NOT_ALLOWED);
    }

    let content_encoding = match headers.get(CONTENT_ENCODING).map(|v| v.to_str()) {
        None => "",
        Some(Ok(value)) => value,
        Some(Err(_)) => {
            warn!("webhook_content_encoding_invalid");
            return WebhookResponse::error(StatusCode::BAD_REQUEST);
        }
    };

    info!(
        content_encoding = %content_encoding,
        body_length = body.len(),
        "webhook_received"
    );

    match state.receiver.receive(&body, content_encoding).await {
        Ok(Outcome::Challenge(challenge)) => {
            (StatusCode::OK, Json(WebhookResponse::Challenge { challenge }))
        }
        Ok(Outcome::Dispatched(_)) | Ok(Outcome::Ignored(_)) => {
            (StatusCode::OK, Json(WebhookResponse::ack()))
        }
        Err(e) => {
            let status = e.status();
            if status == StatusCode::UNAUTHORIZED {
                warn!(error = %e, "webhook_rejected");
            } else {
                error!(
                    error = %e,
                    content_encoding = %content_encoding,
                    body_length = body.len(),
                    "webhook_decode_failed"
                );
            }
            WebhookResponse::error(status)
        }
    }
}
