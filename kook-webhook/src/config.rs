//! Configuration module for environment variable parsing.
//!
//! Every setting comes from the environment; blank values count as unset.

use std::env;

use anyhow::{bail, Result};
use tracing::warn;

use crate::signal::is_verification_enabled;

/// Default base URL of the platform's HTTP API.
pub const DEFAULT_API_BASE_URL: &str = "https://www.kookapp.cn/api/v3/";

/// Default cap on request bodies, before and after decompression.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Route the webhook endpoint is mounted on
    pub webhook_path: String,

    /// Encrypt key from the developer console, if message encryption is on
    pub encrypt_key: Option<String>,

    /// Verify token from the developer console
    pub verify_token: Option<String>,

    /// Refuse to start when no verify token is configured
    pub require_verify_token: bool,

    /// Bot token for outbound API calls
    pub bot_token: Option<String>,

    /// Base URL for outbound API calls
    pub api_base_url: String,

    /// Outbound request timeout in milliseconds
    pub api_timeout_ms: u64,

    /// Maximum number of concurrently running handler tasks (0 = unbounded)
    pub handler_concurrency: usize,

    /// Maximum request body size in bytes, enforced on the raw and the decoded body
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            webhook_path: "/webhook".to_string(),
            encrypt_key: None,
            verify_token: None,
            require_verify_token: false,
            bot_token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_timeout_ms: 8000,
            handler_concurrency: 0,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            port: parse_or("PORT", defaults.port),

            webhook_path: env_opt("KOOK_WEBHOOK_PATH")
                .map(|p| if p.starts_with('/') { p } else { format!("/{}", p) })
                .unwrap_or(defaults.webhook_path),

            encrypt_key: env_opt("KOOK_ENCRYPT_KEY"),

            verify_token: env_opt("KOOK_VERIFY_TOKEN"),

            require_verify_token: parse_bool("KOOK_REQUIRE_VERIFY_TOKEN", false),

            bot_token: env_opt("KOOK_BOT_TOKEN"),

            api_base_url: env_opt("KOOK_API_BASE_URL").unwrap_or(defaults.api_base_url),

            api_timeout_ms: parse_or("KOOK_API_TIMEOUT_MS", defaults.api_timeout_ms),

            handler_concurrency: parse_or("HANDLER_CONCURRENCY", defaults.handler_concurrency),

            max_body_bytes: parse_or("MAX_BODY_BYTES", defaults.max_body_bytes),
        }
    }

    /// Reject configurations that must not start.
    pub fn validate(&self) -> Result<()> {
        if self.require_verify_token && !is_verification_enabled(self.verify_token.as_deref()) {
            bail!("KOOK_REQUIRE_VERIFY_TOKEN is set but KOOK_VERIFY_TOKEN is empty");
        }
        Ok(())
    }
}

/// Read a variable, treating blank values as unset.
fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset or invalid.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env_opt(name) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }),
    }
}

/// Parse a boolean flag such as "true", "1", "yes", "off".
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env_opt(name) {
        Some(v) => v,
        None => return default,
    };

    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid boolean, using default");
            default
        }
    }
}
