mod parser;
use crate::constants::{
    DEFAULT_POLL_INTERVAL, DEFAULT_POLL_MAX_ATTEMPTS, DEFAULT_PORT, DEFAULT_PROVIDER_BASE_URL,
    DEFAULT_STORE_PATH,
};
use crate::core::PollPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use parser::load_service_config;

/// Service configuration, read from an optional YAML file and then
/// overridden by environment variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Port the HTTP server listens on
    pub port: u16,
    /// `production` disables implicit mock mode and `Origin: null`
    pub environment: String,
    /// Provider (Kie.ai) credentials and endpoint
    pub provider: ProviderConfig,
    /// Forced mock mode; when unset, mock is on outside production without an API key
    pub mock_image_generation: Option<bool>,
    /// Allowed CORS origins; empty allows any origin
    pub allowed_origins: Vec<String>,
    /// Location of the persisted task document
    pub task_store_path: PathBuf,
    /// Markdown file whose ```markdown block replaces the built-in prompt template
    pub prompt_template_path: Option<PathBuf>,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between status queries, humantime format ("3s", "500ms")
    pub interval: String,
    pub max_attempts: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: "development".to_string(),
            provider: ProviderConfig::default(),
            mock_image_generation: None,
            allowed_origins: Vec::new(),
            task_store_path: PathBuf::from(DEFAULT_STORE_PATH),
            prompt_template_path: None,
            polling: PollingConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: humantime::format_duration(DEFAULT_POLL_INTERVAL).to_string(),
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

impl ServiceConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Key with surrounding whitespace removed; blank counts as absent
    pub fn api_key(&self) -> Option<&str> {
        self.provider
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Whether tasks are served by the placeholder generator
    pub fn mock_enabled(&self) -> bool {
        self.mock_image_generation
            .unwrap_or_else(|| !self.is_production() && self.api_key().is_none())
    }

    /// Poll settings; `interval` is validated by the parser
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: humantime::parse_duration(&self.polling.interval)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            max_attempts: self.polling.max_attempts,
        }
    }
}
