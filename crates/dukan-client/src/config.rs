//! # Client Configuration
//!
//! Where the API lives, how hard to retry, and which branch this device is.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DUKAN_API_URL=https://pos.example.com/api                          │
//! │     DUKAN_BRANCH_ID=branch-001                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pos/client.toml (Linux)                                  │
//! │     ~/Library/Application Support/com.dukan.pos/client.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     3 retries, 1000 ms base delay, 30 s timeout                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [api]
//! base_url = "https://pos.example.com/api"
//! request_timeout_secs = 30
//!
//! [retry]
//! max_retries = 3
//! base_delay_ms = 1000
//!
//! [branch]
//! id = "branch-001"
//! prefix = "KRT"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use dukan_core::validation::validate_branch_prefix;

use crate::error::{ClientError, ClientResult};
use crate::retry::RetryPolicy;

/// Upper bound on `retry.max_retries`.
pub const MAX_CONFIGURED_RETRIES: u32 = 10;

// =============================================================================
// API Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every endpoint path is joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Retries after the first attempt; `0` disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles for each one after.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    1000
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay(),
        }
    }
}

// =============================================================================
// Branch Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchSettings {
    /// Branch whose day cycle this device trades under.
    pub id: String,

    /// Optional branch code embedded in invoice numbers.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl Default for BranchSettings {
    fn default() -> Self {
        BranchSettings {
            id: "default-branch".to_string(),
            prefix: None,
        }
    }
}

// =============================================================================
// Main Client Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub branch: BranchSettings,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (client.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ClientResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ClientError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Client config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        let url = url::Url::parse(&self.api.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(ClientError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.retry.max_retries > MAX_CONFIGURED_RETRIES {
            return Err(ClientError::InvalidConfig(format!(
                "max_retries must be at most {}",
                MAX_CONFIGURED_RETRIES
            )));
        }

        if self.retry.base_delay_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "base_delay_ms must be greater than 0".into(),
            ));
        }

        if self.branch.id.trim().is_empty() {
            return Err(ClientError::InvalidConfig("branch id is required".into()));
        }

        if let Some(prefix) = &self.branch.prefix {
            validate_branch_prefix(prefix)
                .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DUKAN_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Ok(id) = std::env::var("DUKAN_BRANCH_ID") {
            debug!(branch_id = %id, "Overriding branch ID from environment");
            self.branch.id = id;
        }

        if let Ok(prefix) = std::env::var("DUKAN_BRANCH_PREFIX") {
            self.branch.prefix = (!prefix.trim().is_empty()).then(|| prefix.trim().to_string());
        }

        if let Ok(retries) = std::env::var("DUKAN_MAX_RETRIES") {
            match retries.parse::<u32>() {
                Ok(n) => self.retry.max_retries = n,
                Err(_) => warn!(value = %retries, "Ignoring invalid DUKAN_MAX_RETRIES"),
            }
        }

        if let Ok(delay) = std::env::var("DUKAN_BASE_DELAY_MS") {
            match delay.parse::<u64>() {
                Ok(ms) => self.retry.base_delay_ms = ms,
                Err(_) => warn!(value = %delay, "Ignoring invalid DUKAN_BASE_DELAY_MS"),
            }
        }

        if let Ok(timeout) = std::env::var("DUKAN_REQUEST_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.api.request_timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring invalid DUKAN_REQUEST_TIMEOUT_SECS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "dukan", "pos")
            .map(|dirs| dirs.config_dir().join("client.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    pub fn branch_id(&self) -> &str {
        &self.branch.id
    }

    pub fn branch_prefix(&self) -> Option<&str> {
        self.branch.prefix.as_deref()
    }
}
