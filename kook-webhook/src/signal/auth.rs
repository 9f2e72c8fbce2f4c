//! Verify-token authentication.
//!
//! Every event carries the `verify_token` shown in the developer console.
//! When one is configured here, events whose token differs are rejected.
//! When none is configured, every event is accepted: a permissive default
//! for deployments without a secret. Set `KOOK_REQUIRE_VERIFY_TOKEN` to make
//! a missing token a startup error instead.

use tracing::warn;

use super::types::ChallengeMetadata;
use crate::error::WebhookError;

/// Check the event's verify token against the configured one, if any.
pub fn authenticate(
    meta: &ChallengeMetadata,
    configured: Option<&str>,
) -> Result<(), WebhookError> {
    let expected = match configured.filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => return Ok(()),
    };

    if constant_time_compare(expected, &meta.verify_token) {
        return Ok(());
    }

    warn!(
        expected_length = expected.len(),
        actual_length = meta.verify_token.len(),
        channel_type = %meta.channel_type,
        "webhook_verify_token_mismatch"
    );
    Err(WebhookError::Authentication)
}

/// True when a non-blank verify token is configured.
pub fn is_verification_enabled(verify_token: Option<&str>) -> bool {
    verify_token.is_some_and(|t| !t.trim().is_empty())
}

/// Equality whose running time depends only on the lengths of the inputs.
fn constant_time_compare(expected: &str, actual: &str) -> bool {
    let (expected, actual) = (expected.as_bytes(), actual.as_bytes());
    expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(token: &str) -> ChallengeMetadata {
        ChallengeMetadata {
            channel_type: "GROUP".to_string(),
            verify_token: token.to_string(),
            challenge: String::new(),
        }
    }

    #[test]
    fn test_matching_token() {
        assert!(authenticate(&meta("t1"), Some("t1")).is_ok());
    }

    #[test]
    fn test_mismatched_token() {
        assert!(matches!(
            authenticate(&meta("t2"), Some("t1")),
            Err(WebhookError::Authentication)
        ));
        assert!(matches!(
            authenticate(&meta(""), Some("t1")),
            Err(WebhookError::Authentication)
        ));
    }

    #[test]
    fn test_token_match_is_exact() {
        assert!(authenticate(&meta("T1"), Some("t1")).is_err());
        assert!(authenticate(&meta("t1 "), Some("t1")).is_err());
    }

    #[test]
    fn test_unconfigured_accepts_all() {
        assert!(authenticate(&meta("anything"), None).is_ok());
        assert!(authenticate(&meta("anything"), Some("")).is_ok());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_is_verification_enabled() {
        assert!(!is_verification_enabled(None));
        assert!(!is_verification_enabled(Some("")));
        assert!(!is_verification_enabled(Some("   ")));
        assert!(is_verification_enabled(Some("token")));
    }
}
