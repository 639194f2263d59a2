/*
[INPUT]:  YAML configuration file
[OUTPUT]: Parsed and validated sync runner configuration
[POS]:    Configuration layer - runner setup
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the wallet sync runner
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Backend base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Wallet owner
    pub user_id: i64,
    /// Device reported on every sync; generated when absent
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Persisted token pair written by the app's login flow
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    #[serde(default)]
    pub http: HttpConfig,
}

/// HTTP client tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Refresh tokens this many minutes before they expire
    #[serde(default = "default_expiry_threshold_minutes")]
    pub expiry_threshold_minutes: i64,
    /// Pause after a failed refresh before trying again
    #[serde(default = "default_refresh_cooldown_secs")]
    pub refresh_cooldown_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            expiry_threshold_minutes: default_expiry_threshold_minutes(),
            refresh_cooldown_secs: default_refresh_cooldown_secs(),
        }
    }
}

/// Upper bounds for client tuning values
const MAX_EXPIRY_THRESHOLD_MINUTES: i64 = 24 * 60;
const MAX_REFRESH_COOLDOWN_SECS: u64 = 24 * 60 * 60;

fn default_api_base_url() -> String {
    "https://yessgo.org".to_string()
}

fn default_sync_interval_secs() -> u64 {
    30
}

fn default_token_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("yessgo")
        .join("tokens.json")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_expiry_threshold_minutes() -> i64 {
    5
}

fn default_refresh_cooldown_secs() -> u64 {
    30
}

impl SyncConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("parse config yaml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id <= 0 {
            bail!("user_id must be positive, got {}", self.user_id);
        }
        if self.sync_interval_secs == 0 {
            bail!("sync_interval_secs must be greater than zero");
        }
        if !(0..=MAX_EXPIRY_THRESHOLD_MINUTES).contains(&self.http.expiry_threshold_minutes) {
            bail!(
                "http.expiry_threshold_minutes must be between 0 and {MAX_EXPIRY_THRESHOLD_MINUTES}, got {}",
                self.http.expiry_threshold_minutes
            );
        }
        if self.http.refresh_cooldown_secs > MAX_REFRESH_COOLDOWN_SECS {
            bail!("http.refresh_cooldown_secs must be at most {MAX_REFRESH_COOLDOWN_SECS}");
        }
        url::Url::parse(&self.api_base_url)
            .with_context(|| format!("invalid api_base_url {}", self.api_base_url))?;
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn client_config(&self) -> yessgo_client::ClientConfig {
        yessgo_client::ClientConfig {
            timeout: Duration::from_secs(self.http.timeout_secs),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            expiry_threshold_minutes: self.http.expiry_threshold_minutes,
            refresh_cooldown: Duration::from_secs(self.http.refresh_cooldown_secs),
        }
    }
}
