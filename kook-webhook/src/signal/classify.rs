//! Signal classification of a decoded body.

use tracing::debug;

use super::types::{ChallengeMetadata, InboundEnvelope, SIGNAL_EVENT};
use crate::error::WebhookError;

/// What a decoded envelope asks the receiver to do.
#[derive(Debug)]
pub enum Signal {
    /// Verification handshake; echo the challenge back.
    Challenge(String),
    /// Application event; authenticate with the metadata, then dispatch `d`.
    Event(ChallengeMetadata),
    /// Any other signal kind. Accepted without dispatch.
    Ignored(i32),
}

/// Parse a fully decoded and decrypted body into its envelope.
pub fn parse_envelope(body: &[u8]) -> Result<InboundEnvelope, WebhookError> {
    serde_json::from_slice(body).map_err(WebhookError::MalformedEnvelope)
}

/// Classify an envelope as challenge, event or ignored signal.
pub fn classify(envelope: &InboundEnvelope) -> Result<Signal, WebhookError> {
    if envelope.signal_kind != SIGNAL_EVENT {
        debug!(
            signal_kind = envelope.signal_kind,
            sequence = envelope.sequence,
            "webhook_signal_ignored"
        );
        return Ok(Signal::Ignored(envelope.signal_kind));
    }

    let meta: ChallengeMetadata =
        serde_json::from_str(envelope.data_json()).map_err(WebhookError::MalformedEnvelope)?;

    if meta.is_challenge() {
        return Ok(Signal::Challenge(meta.challenge));
    }

    Ok(Signal::Event(meta))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_str(body: &str) -> Result<Signal, WebhookError> {
        classify(&parse_envelope(body.as_bytes())?)
    }

    #[test]
    fn test_challenge() {
        let signal = classify_str(
            r#"{"s":0,"d":{"channel_type":"WEBHOOK_CHALLENGE","verify_token":"t1","challenge":"abc123"}}"#,
        )
        .unwrap();
        match signal {
            Signal::Challenge(c) => assert_eq!(c, "abc123"),
            other => panic!("expected Challenge, got {:?}", other),
        }
    }

    #[test]
    fn test_challenge_without_value_is_event() {
        let signal =
            classify_str(r#"{"s":0,"d":{"channel_type":"WEBHOOK_CHALLENGE","type":255}}"#).unwrap();
        assert!(matches!(signal, Signal::Event(_)));
    }

    #[test]
    fn test_event() {
        let signal = classify_str(
            r#"{"s":0,"sn":3,"d":{"channel_type":"GROUP","type":1,"verify_token":"t1","content":"x"}}"#,
        )
        .unwrap();
        match signal {
            Signal::Event(meta) => {
                assert_eq!(meta.channel_type, "GROUP");
                assert_eq!(meta.verify_token, "t1");
            }
            other => panic!("expected Event, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_signal_ignored() {
        let signal = classify_str(r#"{"s":7,"d":{"anything":true},"sn":1}"#).unwrap();
        assert!(matches!(signal, Signal::Ignored(7)));
    }

    #[test]
    fn test_malformed_envelope() {
        for body in ["not json", r#"{"d":{}}"#, r#"{"s":"zero"}"#, "[]"] {
            assert!(
                matches!(classify_str(body), Err(WebhookError::MalformedEnvelope(_))),
                "body {:?} should be malformed",
                body
            );
        }
    }

    #[test]
    fn test_event_without_data_is_malformed() {
        assert!(matches!(
            classify_str(r#"{"s":0,"sn":1}"#),
            Err(WebhookError::MalformedEnvelope(_))
        ));
    }
}
