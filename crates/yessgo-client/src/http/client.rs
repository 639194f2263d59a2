/*
[INPUT]:  HTTP configuration (base URL, timeouts, refresh tuning)
[OUTPUT]: Configured reqwest client ready for API calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::time::Duration;

use reqwest::{Client, Method, Request, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::http::{Result, YessError};

/// Base URL for the YessGo backend
const DEFAULT_BASE_URL: &str = "https://yessgo.org";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Access tokens expiring within this many minutes are refreshed before use
    pub expiry_threshold_minutes: i64,
    /// How long a failed refresh blocks further refresh attempts
    pub refresh_cooldown: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            expiry_threshold_minutes: 5,
            refresh_cooldown: Duration::from_secs(30),
        }
    }
}

/// Main HTTP client for the YessGo API
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct YessClient {
    http_client: Client,
    base_url: Url,
    config: ClientConfig,
}

impl YessClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::with_config_and_base_url(config, DEFAULT_BASE_URL)
    }

    /// Create a new client against an explicit backend, e.g. a staging host or mock server
    pub fn with_config_and_base_url(config: ClientConfig, base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(base_url)?,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build full URL for an API endpoint
    pub fn url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint)?)
    }

    /// Build an unauthenticated request builder for an endpoint
    pub fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.url(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// Send a fully built request without any token handling
    pub(crate) async fn execute(&self, request: Request) -> Result<Response> {
        Ok(self.http_client.execute(request).await?)
    }
}

/// Decode a JSON response, mapping non-success statuses to API errors
pub async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let message = String::from_utf8_lossy(&bytes).trim().to_string();
        return Err(YessError::api_error(status, message));
    }

    Ok(serde_json::from_slice(&bytes)?)
}
