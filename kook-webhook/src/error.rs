//! Errors raised while turning an inbound request into a dispatched event.
//!
//! Every variant is terminal for the request that produced it. Nothing in
//! this layer retries; the platform redelivers if it wants to.

use axum::http::StatusCode;
use thiserror::Error;

/// Pre-dispatch failures of the webhook pipeline.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The compressed body could not be inflated.
    #[error("transport decoding failed: {0}")]
    Transport(#[from] std::io::Error),

    /// `Content-Encoding` names something other than identity, gzip or deflate.
    #[error("unsupported content-encoding: {0}")]
    UnsupportedEncoding(String),

    /// The body is encrypted but no encrypt key is configured.
    #[error("payload is encrypted but no encrypt key is configured")]
    MissingKey,

    /// One of the two base64 layers is malformed.
    #[error("invalid base64 in {layer} layer: {source}")]
    Decode {
        layer: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// The decoded envelope is too short to hold an IV and ciphertext.
    #[error("encrypted payload too short: {0} bytes")]
    PayloadFormat(usize),

    /// The ciphertext is not a whole number of AES blocks.
    #[error("ciphertext length {0} is not a multiple of the block size")]
    BlockAlignment(usize),

    /// PKCS7 padding is missing or inconsistent.
    #[error("invalid PKCS7 padding: {0}")]
    Padding(&'static str),

    /// The body is not a `{s, d, sn}` envelope, or its metadata is unreadable.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    /// The event payload does not describe an event.
    #[error("malformed event: {0}")]
    MalformedEvent(#[source] serde_json::Error),

    /// The verify token does not match the configured one.
    #[error("verify token mismatch")]
    Authentication,
}

impl WebhookError {
    /// HTTP status the request handler answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::Authentication => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
