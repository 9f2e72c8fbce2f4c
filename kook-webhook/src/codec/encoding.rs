//! HTTP `Content-Encoding` reversal for inbound bodies.

use std::io::{self, Read};

use flate2::read::{MultiGzDecoder, ZlibDecoder};

use crate::error::WebhookError;

/// Recover the raw body bytes from a possibly compressed request body.
///
/// Supported encodings are identity (empty or `identity`), `gzip` and
/// `deflate` (zlib framing). The header value is trimmed and matched
/// case-insensitively. Gzip bodies may hold several members.
///
/// The decoded body may not exceed `limit` bytes; a larger result fails
/// with a transport error before more than `limit + 1` bytes are inflated.
pub fn decode_body(
    body: &[u8],
    content_encoding: &str,
    limit: usize,
) -> Result<Vec<u8>, WebhookError> {
    match content_encoding.trim().to_ascii_lowercase().as_str() {
        "" | "identity" => {
            if body.len() > limit {
                return Err(too_large(limit));
            }
            Ok(body.to_vec())
        }
        "gzip" => inflate(MultiGzDecoder::new(body), limit),
        "deflate" => inflate(ZlibDecoder::new(body), limit),
        _ => Err(WebhookError::UnsupportedEncoding(
            content_encoding.to_string(),
        )),
    }
}

/// Drain a decoder up to `limit` bytes; the decoder is dropped before returning.
fn inflate<R: Read>(decoder: R, limit: usize) -> Result<Vec<u8>, WebhookError> {
    let mut out = Vec::new();
    decoder.take(limit as u64 + 1).read_to_end(&mut out)?;

    if out.len() > limit {
        return Err(too_large(limit));
    }
    Ok(out)
}

fn too_large(limit: usize) -> WebhookError {
    WebhookError::Transport(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("decoded body exceeds {} bytes", limit),
    ))
}
