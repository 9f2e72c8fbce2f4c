//! Encrypted webhook payloads.
//!
//! When an encrypt key is set in the developer console, the platform wraps
//! every body as `{"encrypt": "<base64>"}`. The outer base64 decodes to a
//! 16-byte IV followed by a second base64 string, which decodes to the
//! AES-256-CBC ciphertext of the real `{s, d, sn}` body, PKCS7-padded.
//!
//! # Key handling
//!
//! The configured key is used as raw bytes, zero-padded on the right or
//! truncated to exactly 32 bytes. This is the platform's compatibility
//! rule, not a key-derivation function, and must not be replaced with one:
//! doing so silently yields garbage plaintext instead of an error.

use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
use serde::Deserialize;
use tracing::debug;

use crate::error::WebhookError;

/// AES block size, also the IV length.
pub const BLOCK_SIZE: usize = 16;

/// Length every configured key is normalized to.
pub const KEY_SIZE: usize = 32;

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// Wire form of an encrypted body.
#[derive(Debug, Deserialize)]
pub struct EncryptedEnvelope {
    #[serde(default)]
    pub encrypt: String,
}

/// Normalize a configured key to 32 bytes: zero-pad short keys, truncate long ones.
pub fn normalize_key(key: &str) -> [u8; KEY_SIZE] {
    let mut out = [0u8; KEY_SIZE];
    let bytes = key.as_bytes();
    let n = bytes.len().min(KEY_SIZE);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Decrypt `body` if it is an encryption envelope, otherwise return it unchanged.
///
/// A body that does not parse as `{"encrypt": "..."}`, or whose `encrypt`
/// field is empty, is plaintext. That is not an error.
pub fn maybe_decrypt(body: Vec<u8>, key: Option<&str>) -> Result<Vec<u8>, WebhookError> {
    let envelope: EncryptedEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(_) => return Ok(body),
    };

    if envelope.encrypt.is_empty() {
        return Ok(body);
    }

    let key = key.filter(|k| !k.is_empty()).ok_or(WebhookError::MissingKey)?;
    let plain = decrypt_payload(&envelope.encrypt, key)?;

    debug!(
        cipher_length = envelope.encrypt.len(),
        plain_length = plain.len(),
        "webhook_payload_decrypted"
    );

    Ok(plain)
}

/// Decrypt the `encrypt` field of an envelope with the given key.
pub fn decrypt_payload(encrypted: &str, key: &str) -> Result<Vec<u8>, WebhookError> {
    let key = normalize_key(key);

    let payload = STANDARD
        .decode(encrypted)
        .map_err(|source| WebhookError::Decode { layer: "outer", source })?;

    if payload.len() <= BLOCK_SIZE {
        return Err(WebhookError::PayloadFormat(payload.len()));
    }

    let (iv, inner) = payload.split_at(BLOCK_SIZE);
    let mut buf = STANDARD
        .decode(inner)
        .map_err(|source| WebhookError::Decode { layer: "inner", source })?;

    if buf.len() % BLOCK_SIZE != 0 {
        return Err(WebhookError::BlockAlignment(buf.len()));
    }

    let cipher_len = buf.len();
    let len = Aes256CbcDec::new_from_slices(&key, iv)
        .map_err(|_| WebhookError::PayloadFormat(payload.len()))?
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| WebhookError::BlockAlignment(cipher_len))?
        .len();
    buf.truncate(len);

    let unpadded = pkcs7_unpad(&buf)?;
    buf.truncate(unpadded);
    Ok(buf)
}

/// Produce the `encrypt` field the platform would send for `plain`.
///
/// Inverse of [`decrypt_payload`]; used by tests and local simulators.
pub fn encrypt_payload(plain: &[u8], key: &str, iv: &[u8; BLOCK_SIZE]) -> String {
    use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut};

    let key = normalize_key(key);
    let cipher_text =
        Aes256CbcEnc::new(&key.into(), &(*iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plain);

    let mut payload = iv.to_vec();
    payload.extend_from_slice(STANDARD.encode(cipher_text).as_bytes());
    STANDARD.encode(payload)
}

/// Validate PKCS7 padding and return the length of the unpadded prefix.
fn pkcs7_unpad(data: &[u8]) -> Result<usize, WebhookError> {
    let pad = match data.last() {
        Some(&p) => p as usize,
        None => return Err(WebhookError::Padding("empty plaintext")),
    };

    if pad == 0 || pad > BLOCK_SIZE || pad > data.len() {
        return Err(WebhookError::Padding("pad length out of range"));
    }

    if data[data.len() - pad..].iter().any(|&b| b as usize != pad) {
        return Err(WebhookError::Padding("inconsistent pad bytes"));
    }

    Ok(data.len() - pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    const KEY: &str = "0123456789abcdef0123456789abcdef";
    const BODY: &[u8] = br#"{"s":0,"d":{"type":9,"content":"hi"},"sn":1}"#;

    fn random_iv() -> [u8; BLOCK_SIZE] {
        let mut iv = [0u8; BLOCK_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);
        iv
    }

    /// Encrypt raw blocks without adding padding, so tests control the tail.
    fn encrypt_unpadded(blocks: &[u8], key: &str, iv: &[u8; BLOCK_SIZE]) -> String {
        use cbc::cipher::BlockEncryptMut;

        let key = normalize_key(key);
        let cipher_text = Aes256CbcEnc::new(&key.into(), &(*iv).into())
            .encrypt_padded_vec_mut::<NoPadding>(blocks);
        let mut payload = iv.to_vec();
        payload.extend_from_slice(STANDARD.encode(cipher_text).as_bytes());
        STANDARD.encode(payload)
    }

    fn envelope(encrypted: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({ "encrypt": encrypted })).unwrap()
    }

    #[test]
    fn test_round_trip() {
        for plain in [&b""[..], &b"x"[..], &[7u8; 16][..], BODY] {
            let iv = random_iv();
            let encrypted = encrypt_payload(plain, KEY, &iv);
            assert_eq!(decrypt_payload(&encrypted, KEY).unwrap(), plain);
        }
    }

    #[test]
    fn test_maybe_decrypt_envelope() {
        let body = envelope(&encrypt_payload(BODY, KEY, &random_iv()));
        assert_eq!(maybe_decrypt(body, Some(KEY)).unwrap(), BODY);
    }

    #[test]
    fn test_plaintext_passthrough() {
        assert_eq!(maybe_decrypt(BODY.to_vec(), None).unwrap(), BODY);
        assert_eq!(maybe_decrypt(b"not json".to_vec(), None).unwrap(), b"not json");

        let empty = br#"{"encrypt":""}"#.to_vec();
        assert_eq!(maybe_decrypt(empty.clone(), Some(KEY)).unwrap(), empty);

        let wrong_type = br#"{"encrypt":42}"#.to_vec();
        assert_eq!(maybe_decrypt(wrong_type.clone(), None).unwrap(), wrong_type);
    }

    #[test]
    fn test_missing_key() {
        let body = envelope(&encrypt_payload(BODY, KEY, &random_iv()));
        assert!(matches!(maybe_decrypt(body.clone(), None), Err(WebhookError::MissingKey)));
        assert!(matches!(maybe_decrypt(body, Some("")), Err(WebhookError::MissingKey)));
    }

    #[test]
    fn test_short_key_is_zero_padded() {
        let short = "0123456789";
        let padded = format!("{}{}", short, "\0".repeat(KEY_SIZE - short.len()));
        assert_eq!(normalize_key(short), normalize_key(&padded));

        let encrypted = encrypt_payload(BODY, &padded, &random_iv());
        assert_eq!(decrypt_payload(&encrypted, short).unwrap(), BODY);
    }

    #[test]
    fn test_long_key_is_truncated() {
        let long = "0123456789abcdef0123456789abcdefEXTRA!!!";
        assert_eq!(long.len(), 40);

        let encrypted = encrypt_payload(BODY, &long[..KEY_SIZE], &random_iv());
        assert_eq!(decrypt_payload(&encrypted, long).unwrap(), BODY);
    }

    #[test]
    fn test_malformed_outer_base64() {
        match decrypt_payload("!!!not base64!!!", KEY) {
            Err(WebhookError::Decode { layer, .. }) => assert_eq!(layer, "outer"),
            other => panic!("expected Decode, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_inner_base64() {
        let mut payload = random_iv().to_vec();
        payload.extend_from_slice(b"@@@@ not base64");
        match decrypt_payload(&STANDARD.encode(payload), KEY) {
            Err(WebhookError::Decode { layer, .. }) => assert_eq!(layer, "inner"),
            other => panic!("expected Decode, got {:?}", other),
        }
    }

    #[test]
    fn test_payload_too_short() {
        let encoded = STANDARD.encode(random_iv());
        assert!(matches!(
            decrypt_payload(&encoded, KEY),
            Err(WebhookError::PayloadFormat(16))
        ));
    }

    #[test]
    fn test_block_alignment() {
        let mut payload = random_iv().to_vec();
        payload.extend_from_slice(STANDARD.encode([1u8; 15]).as_bytes());
        assert!(matches!(
            decrypt_payload(&STANDARD.encode(payload), KEY),
            Err(WebhookError::BlockAlignment(15))
        ));
    }

    #[test]
    fn test_padding_zero_rejected() {
        let mut block = [b'a'; 16];
        block[15] = 0;
        let encrypted = encrypt_unpadded(&block, KEY, &random_iv());
        assert!(matches!(decrypt_payload(&encrypted, KEY), Err(WebhookError::Padding(_))));
    }

    #[test]
    fn test_padding_too_large_rejected() {
        let block = [17u8; 32];
        let encrypted = encrypt_unpadded(&block, KEY, &random_iv());
        assert!(matches!(decrypt_payload(&encrypted, KEY), Err(WebhookError::Padding(_))));
    }

    #[test]
    fn test_padding_inconsistent_rejected() {
        let mut block = [b'a'; 16];
        block[13] = 3;
        block[14] = 2;
        block[15] = 3;
        let encrypted = encrypt_unpadded(&block, KEY, &random_iv());
        assert!(matches!(decrypt_payload(&encrypted, KEY), Err(WebhookError::Padding(_))));
    }

    #[test]
    fn test_wrong_key_never_yields_plaintext() {
        let encrypted = encrypt_payload(BODY, KEY, &random_iv());
        if let Ok(plain) = decrypt_payload(&encrypted, "another key entirely") {
            assert_ne!(plain, BODY);
        }
    }

    #[test]
    fn test_pkcs7_unpad() {
        assert_eq!(pkcs7_unpad(&[b'a', b'b', 2, 2]).unwrap(), 2);
        assert_eq!(pkcs7_unpad(&[16u8; 16]).unwrap(), 0);
        assert!(pkcs7_unpad(&[]).is_err());
        assert!(pkcs7_unpad(&[5, 5]).is_err());
    }
}
