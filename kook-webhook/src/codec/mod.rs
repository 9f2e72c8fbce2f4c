//! Body codecs applied before any JSON is inspected.
//!
//! ```text
//! raw body → decode_body (Content-Encoding) → maybe_decrypt (AES-256-CBC) → plaintext
//! ```

pub mod crypto;
pub mod encoding;

pub use crypto::{decrypt_payload, encrypt_payload, maybe_decrypt, normalize_key};
pub use encoding::decode_body;
