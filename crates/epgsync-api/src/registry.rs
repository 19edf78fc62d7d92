//! Provider registry: maps provider names to constructors.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use chrono::NaiveDate;

use crate::batch::{BatchOptions, BatchOutcome};
use crate::error::EpgError;
use crate::model::{ChannelMappingInfo, Program, ProviderChannel, ProviderConfig, ProviderHealth};
use crate::provider::LocalEpgProvider;
use crate::providers::{HebeiProvider, hebei};

/// Builds a provider from its runtime config.
pub type ProviderConstructor = fn(&ProviderConfig) -> Result<Provider>;

/// Any built-in provider.
///
/// `EpgProvider` is not object safe, so dispatch goes through this enum
/// instead of `dyn`.
#[derive(Debug)]
#[non_exhaustive]
pub enum Provider {
    /// Hebei Radio and Television.
    Hebei(HebeiProvider),
}

impl LocalEpgProvider for Provider {
    fn id(&self) -> &str {
        match self {
            Self::Hebei(p) => p.id(),
        }
    }

    fn channels(&self) -> &[ProviderChannel] {
        match self {
            Self::Hebei(p) => p.channels(),
        }
    }

    fn today(&self) -> NaiveDate {
        match self {
            Self::Hebei(p) => p.today(),
        }
    }

    async fn health_check(&self) -> ProviderHealth {
        match self {
            Self::Hebei(p) => p.health_check().await,
        }
    }

    async fn fetch_epg(
        &self,
        provider_channel_id: &str,
        channel_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Program>, EpgError> {
        match self {
            Self::Hebei(p) => p.fetch_epg(provider_channel_id, channel_id, date).await,
        }
    }

    async fn fetch_epg_batch(
        &self,
        mappings: &[ChannelMappingInfo],
        date: NaiveDate,
        options: &BatchOptions,
    ) -> BatchOutcome {
        match self {
            Self::Hebei(p) => p.fetch_epg_batch(mappings, date, options).await,
        }
    }

    fn parse_epg_response(
        &self,
        data: &[u8],
        provider_channel_id: &str,
        channel_id: &str,
        date: &str,
    ) -> Result<Vec<Program>, EpgError> {
        match self {
            Self::Hebei(p) => p.parse_epg_response(data, provider_channel_id, channel_id, date),
        }
    }
}

fn build_hebei(config: &ProviderConfig) -> Result<Provider> {
    HebeiProvider::new(config).map(Provider::Hebei)
}

/// Registered provider: constructor plus static channel catalog.
#[derive(Debug, Clone, Copy)]
struct RegistryEntry {
    constructor: ProviderConstructor,
    channels: &'static [ProviderChannel],
}

/// Name-to-constructor table.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    entries: BTreeMap<&'static str, RegistryEntry>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in provider registered.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            hebei::PROVIDER_ID,
            HebeiProvider::channel_list(),
            build_hebei,
        );
        registry
    }

    /// Registers `constructor` under `name`, returning the constructor it
    /// replaced.
    pub fn register(
        &mut self,
        name: &'static str,
        channels: &'static [ProviderChannel],
        constructor: ProviderConstructor,
    ) -> Option<ProviderConstructor> {
        self.entries
            .insert(
                name,
                RegistryEntry {
                    constructor,
                    channels,
                },
            )
            .map(|previous| previous.constructor)
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Static channel catalog of `name`, available without constructing
    /// the provider.
    #[must_use]
    pub fn channels(&self, name: &str) -> Option<&'static [ProviderChannel]> {
        self.entries.get(name).map(|entry| entry.channels)
    }

    /// Builds the provider named by `config.id`.
    ///
    /// # Errors
    ///
    /// - `config.id` is not registered.
    /// - The provider's constructor rejects the config.
    pub fn create(&self, config: &ProviderConfig) -> Result<Provider> {
        let Some(entry) = self.entries.get(config.id.as_str()) else {
            bail!(
                "unknown provider: {} (available: {})",
                config.id,
                self.names().join(", ")
            );
        };
        tracing::debug!(provider = %config.id, "Creating provider");
        (entry.constructor)(config)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn failing_constructor(_config: &ProviderConfig) -> Result<Provider> {
        bail!("constructor override")
    }

    #[test]
    fn test_with_builtin_lists_hebei() {
        // Arrange & Act
        let registry = ProviderRegistry::with_builtin();

        // Assert
        assert_eq!(registry.names(), vec!["hebei"]);
        assert!(registry.contains("hebei"));
        assert!(!registry.contains("zhejiang"));
    }

    #[test]
    fn test_channels_without_construction() {
        // Arrange
        let registry = ProviderRegistry::with_builtin();

        // Act
        let channels = registry.channels("hebei").unwrap();

        // Assert
        assert_eq!(channels.len(), 7);
        assert_eq!(channels.first().unwrap().name, "河北卫视");
        assert!(registry.channels("nowhere").is_none());
    }

    #[test]
    fn test_create_unknown_provider() {
        // Arrange
        let registry = ProviderRegistry::with_builtin();

        // Act
        let err = registry
            .create(&ProviderConfig::new("nowhere"))
            .unwrap_err();

        // Assert
        let msg = err.to_string();
        assert!(msg.contains("unknown provider: nowhere"));
        assert!(msg.contains("hebei"));
    }

    #[test]
    fn test_create_hebei() {
        // Arrange
        let registry = ProviderRegistry::with_builtin();
        let config = ProviderConfig::new("hebei").with_base_url("http://127.0.0.1:9");

        // Act
        let provider = registry.create(&config).unwrap();

        // Assert
        assert_eq!(provider.id(), "hebei");
        assert_eq!(provider.channels().len(), 7);
    }

    #[test]
    fn test_create_hebei_without_base_url() {
        // Arrange
        let registry = ProviderRegistry::with_builtin();

        // Act
        let result = registry.create(&ProviderConfig::new("hebei"));

        // Assert
        assert!(result.unwrap_err().to_string().contains("base_url is required"));
    }

    #[test]
    fn test_register_replaces_previous() {
        // Arrange
        let mut registry = ProviderRegistry::with_builtin();

        // Act
        let previous = registry.register("hebei", &[], failing_constructor);
        let result = registry.create(&ProviderConfig::new("hebei").with_base_url("http://x"));

        // Assert
        assert!(previous.is_some());
        assert_eq!(result.unwrap_err().to_string(), "constructor override");
    }

    #[test]
    fn test_empty_registry() {
        // Arrange & Act
        let registry = ProviderRegistry::new();

        // Assert
        assert!(registry.names().is_empty());
        assert!(registry.create(&ProviderConfig::new("hebei")).is_err());
    }
}
