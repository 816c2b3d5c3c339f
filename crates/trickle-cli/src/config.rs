//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use trickle_core::RetryPolicy;

/// Global configuration for trickle
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub retry: RetryConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Validated policy, with command-line overrides applied.
    pub fn policy(&self, max_attempts: Option<u32>, delay_ms: Option<u64>) -> Result<RetryPolicy> {
        let max_attempts = max_attempts.unwrap_or(self.max_attempts);
        let delay = Duration::from_millis(delay_ms.unwrap_or(self.delay_ms));
        RetryPolicy::new(max_attempts, delay).context("Invalid retry policy")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub count: u64,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub status: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub needle: String,
    pub limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            count: 1_000_000,
            status: "OK".to_string(),
            needle: "logline".to_string(),
            limit: 5,
        }
    }
}

/// Deserialize a string that may be an environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    expand_env_var(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("environment variable in {raw} is not set"))
    })
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./trickle.toml (current directory)
    /// 2. ~/.config/trickle/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("trickle.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "trickle") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
