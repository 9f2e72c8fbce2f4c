//! Request/response plumbing against the platform's HTTP API.

use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::value::RawValue;
use tracing::{debug, warn};
use url::Url;

/// Standard response envelope: `{"code": 0, "message": "", "data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}

impl ApiResponse {
    /// Fail unless the platform reported success (`code == 0`).
    pub fn into_result(self) -> Result<Self> {
        if self.code != 0 {
            bail!("api error {}: {}", self.code, self.message);
        }
        Ok(self)
    }

    /// Deserialize the raw `data` payload.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = self.data.as_deref().map(RawValue::get).unwrap_or("null");
        serde_json::from_str(raw).context("Failed to parse api response data")
    }
}

/// Minimal transport the REST layer is built on.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> impl Future<Output = Result<ApiResponse>> + Send;

    fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> impl Future<Output = Result<ApiResponse>> + Send;
}

/// `reqwest`-backed transport authenticating with a bot token.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    bot_token: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, bot_token: &str, timeout: Duration) -> Result<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).context("Invalid API base URL")?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            bot_token: bot_token.to_string(),
        })
    }

    /// Resolve an API path such as `user/me` against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid API path: {}", path))
    }

    async fn execute(&self, path: &str, request: RequestBuilder) -> Result<ApiResponse> {
        let response = request
            .header(AUTHORIZATION, format!("Bot {}", self.bot_token))
            .send()
            .await
            .with_context(|| format!("Request to {} failed", path))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response from {}", path))?;

        debug!(path = %path, status = status.as_u16(), body_length = body.len(), "api_response");

        match serde_json::from_slice::<ApiResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                warn!(
                    path = %path,
                    status = status.as_u16(),
                    error = %e,
                    "api_response_unparsable"
                );
                bail!("unexpected response from {} (HTTP {})", path, status)
            }
        }
    }
}

impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse> {
        let url = self.endpoint(path)?;
        self.execute(path, self.client.get(url).query(query)).await
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<ApiResponse> {
        let url = self.endpoint(path)?;
        self.execute(path, self.client.post(url).json(body)).await
    }
}

/// The bot account behind the configured token.
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub identify_num: String,
    #[serde(default)]
    pub bot: bool,
}

/// Fetch the current bot account (`user/me`).
pub async fn fetch_bot_user<T: Transport>(transport: &T) -> Result<BotUser> {
    transport.get("user/me", &[]).await?.into_result()?.data_as()
}
