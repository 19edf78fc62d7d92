//! Canonical EPG data model shared by every provider.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default per-fetch timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default batch fan-out limit.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// A normalized broadcast slot.
///
/// Created fresh per fetch and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Canonical channel ID (provider-independent).
    pub channel_id: String,
    /// Broadcast title.
    pub title: String,
    /// Broadcast start (absolute instant).
    pub start_time: DateTime<Utc>,
    /// Broadcast end (absolute instant, always after `start_time`).
    pub end_time: DateTime<Utc>,
    /// IANA name of the timezone the upstream timestamps were expressed in.
    pub original_timezone: String,
    /// ID of the provider that produced this record.
    pub provider_id: String,
}

/// Static channel catalog entry of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderChannel {
    /// Display name.
    pub name: &'static str,
    /// Provider-local channel ID used in outbound requests.
    pub id: &'static str,
}

impl ProviderChannel {
    /// Creates a new catalog entry.
    #[must_use]
    pub const fn new(name: &'static str, id: &'static str) -> Self {
        Self { name, id }
    }
}

/// Associates a provider-local channel ID with the canonical channel ID
/// that fetched programs are tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMappingInfo {
    /// Provider-local channel ID.
    pub provider_channel_id: String,
    /// Canonical channel ID.
    pub channel_id: String,
}

impl ChannelMappingInfo {
    /// Creates a new mapping.
    #[must_use]
    pub fn new(provider_channel_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            provider_channel_id: provider_channel_id.into(),
            channel_id: channel_id.into(),
        }
    }
}

/// Point-in-time health verdict of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderHealth {
    /// Whether the health-check fetch succeeded.
    pub healthy: bool,
    /// `"OK"` or a description of the failure.
    pub message: String,
}

impl ProviderHealth {
    /// Healthy verdict.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            healthy: true,
            message: String::from("OK"),
        }
    }

    /// Unhealthy verdict with a descriptive message.
    #[must_use]
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
        }
    }
}

/// Runtime settings of a single provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::module_name_repetitions)]
pub struct ProviderConfig {
    /// Registered provider name (e.g. `"hebei"`).
    pub id: String,
    /// Disabled providers are skipped by health checks.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Upstream base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// User-Agent header sent with every request.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Per-fetch timeout in seconds (default: 30).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Minimum interval between requests in milliseconds (default: 0).
    #[serde(default)]
    pub min_interval_ms: Option<u64>,
    /// Batch fan-out limit (default: 4).
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

const fn default_enabled() -> bool {
    true
}

impl ProviderConfig {
    /// Creates an enabled config with every setting at its default.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            base_url: None,
            user_agent: None,
            timeout_secs: None,
            min_interval_ms: None,
            max_concurrency: None,
        }
    }

    /// Sets the upstream base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-fetch timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout_secs.map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }

    /// Minimum interval between requests.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval_ms
            .map_or(Duration::ZERO, Duration::from_millis)
    }

    /// Batch fan-out limit, never below 1.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
            .unwrap_or(DEFAULT_MAX_CONCURRENCY)
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_provider_config_defaults() {
        // Arrange & Act
        let config = ProviderConfig::new("hebei");

        // Assert
        assert!(config.enabled);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.min_interval(), Duration::ZERO);
        assert_eq!(config.max_concurrency(), DEFAULT_MAX_CONCURRENCY);
    }

    #[test]
    fn test_provider_config_zero_concurrency_clamped() {
        // Arrange
        let mut config = ProviderConfig::new("hebei");
        config.max_concurrency = Some(0);

        // Act & Assert
        assert_eq!(config.max_concurrency(), 1);
    }

    #[test]
    fn test_provider_config_enabled_defaults_to_true_when_deserialized() {
        // Arrange
        let json = r#"{"id": "hebei", "timeout_secs": 5}"#;

        // Act
        let config: ProviderConfig = serde_json::from_str(json).unwrap();

        // Assert
        assert!(config.enabled);
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_provider_health_constructors() {
        // Arrange & Act
        let ok = ProviderHealth::ok();
        let bad = ProviderHealth::unhealthy("boom");

        // Assert
        assert!(ok.healthy);
        assert_eq!(ok.message, "OK");
        assert!(!bad.healthy);
        assert_eq!(bad.message, "boom");
    }
}
