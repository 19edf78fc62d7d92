//! `AppConfig` struct and TOML loading.

use std::path::Path;

use anyhow::{Context, Result};
use epgsync_api::{ChannelMappingInfo, ProviderConfig};
use serde::Deserialize;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Defaults applied to every provider.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Per-provider overrides.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Channel mappings used by `fetch` when `--channels` is omitted.
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

/// Fetch defaults, overridden by `[[providers]]` entries.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct FetchConfig {
    /// Batch fan-out limit.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    /// Per-fetch timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// User-Agent header.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Minimum interval between requests in milliseconds.
    #[serde(default)]
    pub min_interval_ms: Option<u64>,
}

/// One `[[channels]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChannelEntry {
    /// Provider name.
    pub provider: String,
    /// Provider-local channel ID.
    pub provider_channel_id: String,
    /// Canonical channel ID.
    pub channel_id: String,
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Effective settings for provider `id`: its `[[providers]]` entry with
    /// unset fields filled from `[fetch]`.
    #[must_use]
    pub fn provider_config(&self, id: &str) -> ProviderConfig {
        let mut config = self
            .providers
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .unwrap_or_else(|| ProviderConfig::new(id));

        if config.max_concurrency.is_none() {
            config.max_concurrency = self.fetch.max_concurrency;
        }
        if config.timeout_secs.is_none() {
            config.timeout_secs = self.fetch.timeout_secs;
        }
        if config.min_interval_ms.is_none() {
            config.min_interval_ms = self.fetch.min_interval_ms;
        }
        if config.user_agent.is_none() {
            config.user_agent.clone_from(&self.fetch.user_agent);
        }
        config
    }

    /// Channel mappings configured for `provider`, in file order.
    #[must_use]
    pub fn channel_mappings(&self, provider: &str) -> Vec<ChannelMappingInfo> {
        self.channels
            .iter()
            .filter(|c| c.provider == provider)
            .map(|c| ChannelMappingInfo::new(c.provider_channel_id.clone(), c.channel_id.clone()))
            .collect()
    }
}
