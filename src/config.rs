//! Bridge configuration: where the controller lives and how patiently we
//! verify its writes. Read once at startup; the core never re-reads it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Environment variable overriding the controller base URL.
pub const ENV_BASE_URL: &str = "GLOWLINK_URL";

fn default_base_url() -> String {
    "http://127.0.0.1:8888".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_poll_attempts() -> u32 {
    10
}

fn default_poll_interval_ms() -> u64 {
    250
}

/// Connection and verification settings.
///
/// The poll budget is the only timeout-like mechanism in the core: a write
/// is confirmed by re-reading up to `poll_attempts` times with a fixed
/// `poll_interval_ms` delay between reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_attempts: default_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl BridgeConfig {
    /// Load from a JSON file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::validation(format!("Cannot read config {}: {e}", path.display()))
        })?;
        let mut config: BridgeConfig = serde_json::from_str(&text).map_err(|e| {
            BridgeError::validation(format!("Invalid config {}: {e}", path.display()))
        })?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus environment overrides, for callers without a config file.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            if !url.trim().is_empty() {
                self.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
    }
}
