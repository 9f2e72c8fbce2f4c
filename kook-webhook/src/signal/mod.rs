//! Protocol-level handling of a decoded body: envelope parsing, challenge
//! detection and verify-token authentication.

pub mod auth;
pub mod classify;
pub mod types;

pub use auth::{authenticate, is_verification_enabled};
pub use classify::{classify, parse_envelope, Signal};
pub use types::{event_type, ChallengeMetadata, Event, InboundEnvelope, SIGNAL_EVENT};
