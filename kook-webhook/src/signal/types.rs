//! Wire types of the push-event protocol.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Signal kind of an application event (and of the challenge handshake).
pub const SIGNAL_EVENT: i32 = 0;

/// `channel_type` value announcing a verification handshake.
pub const CHALLENGE_CHANNEL_TYPE: &str = "WEBHOOK_CHALLENGE";

/// Event types as carried in the `type` field of an event.
pub mod event_type {
    pub const TEXT: i32 = 1;
    pub const IMAGE: i32 = 2;
    pub const VIDEO: i32 = 3;
    pub const FILE: i32 = 4;
    pub const AUDIO: i32 = 8;
    pub const KMARKDOWN: i32 = 9;
    pub const CARD: i32 = 10;
    pub const SYSTEM: i32 = 255;
}

/// One decoded, decrypted webhook body: `{"s": .., "d": .., "sn": ..}`.
#[derive(Debug, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "s")]
    pub signal_kind: i32,
    #[serde(rename = "sn", default)]
    pub sequence: i64,
    #[serde(rename = "d", default)]
    pub data: Option<Box<RawValue>>,
}

impl InboundEnvelope {
    /// Raw JSON of `d`, or `null` when absent.
    pub fn data_json(&self) -> &str {
        self.data.as_deref().map(RawValue::get).unwrap_or("null")
    }
}

/// The subset of `d` used to recognize a handshake and authenticate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChallengeMetadata {
    #[serde(default)]
    pub channel_type: String,
    #[serde(default)]
    pub verify_token: String,
    #[serde(default)]
    pub challenge: String,
}

impl ChallengeMetadata {
    /// True for a handshake: challenge channel type (any case) with a non-empty challenge.
    pub fn is_challenge(&self) -> bool {
        self.channel_type.eq_ignore_ascii_case(CHALLENGE_CHANNEL_TYPE) && !self.challenge.is_empty()
    }
}

/// An authenticated application event, shared read-only with every handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// `GROUP`, `PERSON` or `BROADCAST`.
    #[serde(default)]
    pub channel_type: String,
    #[serde(rename = "type")]
    pub event_type: i32,
    #[serde(default)]
    pub target_id: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub msg_id: String,
    #[serde(default)]
    pub msg_timestamp: i64,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub verify_token: String,
    /// Type-specific payload (author, mentions, system event body, ...).
    #[serde(default)]
    pub extra: serde_json::Value,
}
