use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Model sent with chat requests; backend settings fill this in when unset.
    #[serde(default)]
    pub model: Option<String>,
    /// Collection queried for grounding context; backend settings fill this in
    /// when unset.
    #[serde(default)]
    pub collection: Option<String>,
    /// Wall-clock bound over a whole chat exchange (request + stream).
    #[serde(default = "default_stream_timeout_secs")]
    pub stream_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: None,
            collection: None,
            stream_timeout_secs: default_stream_timeout_secs(),
        }
    }
}

fn default_stream_timeout_secs() -> u64 {
    60
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ChatConfig {
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }
}

impl Config {
    /// Built-in defaults, used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate api
    if config.api.base_url.trim().is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }
    reqwest::Url::parse(&config.api.base_url)
        .with_context(|| format!("api.base_url is not a valid URL: {}", config.api.base_url))?;
    if config.api.request_timeout_secs == 0 {
        anyhow::bail!("api.request_timeout_secs must be > 0");
    }

    // Validate chat
    if config.chat.stream_timeout_secs == 0 {
        anyhow::bail!("chat.stream_timeout_secs must be > 0");
    }
    if let Some(model) = &config.chat.model {
        if model.trim().is_empty() {
            anyhow::bail!("chat.model must not be blank when set");
        }
    }

    Ok(config)
}
