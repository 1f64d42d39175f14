//! TOML configuration for the `ci-webhook` binary.
//!
//! ```toml
//! [platform]
//! base_url = "https://git.example.com"
//! ssh_base_url = "ssh://git@git.example.com:7999"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [notifier]
//! timeout_secs = 30
//!
//! [[repositories]]
//! repository = { project_key = "PRJ", slug = "service" }
//! endpoints = [{ base_url = "https://ci.example.com/jenkins" }]
//! ignore_committers = ["release-bot"]
//! branch_options = { mode = "allow", patterns = ["main", "release/*"] }
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use jenkins::PlatformUrls;
use serde::Deserialize;
use webhook::{InMemorySettingsService, Settings};

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// `[logging]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Log line format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// `[notifier]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Timeout for one call to a CI endpoint, in seconds.
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            timeout_secs: jenkins::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl NotifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub platform: PlatformUrls,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub repositories: Vec<Settings>,
}

impl AppConfig {
    /// Reads and parses the configuration file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        if config.notifier.timeout_secs == 0 {
            anyhow::bail!("notifier.timeout_secs must be greater than zero");
        }
        Ok(config)
    }

    /// Builds the settings lookup, validating every repository entry.
    pub fn settings_service(&self) -> anyhow::Result<InMemorySettingsService> {
        Ok(InMemorySettingsService::from_settings(
            self.repositories.iter().cloned(),
        )?)
    }
}
