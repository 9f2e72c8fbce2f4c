//! Outbound HTTP API transport.
//!
//! The receiver itself never calls out; this is the collaborator the rest
//! of a bot uses for REST calls. Only the transport and the response
//! envelope live here.

pub mod transport;

pub use transport::{fetch_bot_user, ApiResponse, BotUser, HttpTransport, Transport};
