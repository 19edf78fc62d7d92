//! Provider liveness check.

use tracing::instrument;

use crate::model::ProviderHealth;
use crate::provider::LocalEpgProvider;

/// Fetches the first catalog channel for the provider's current date and
/// converts the outcome into a verdict.
///
/// This is an error boundary: every failure becomes `healthy == false`.
#[instrument(skip_all, fields(provider = provider.id()))]
pub async fn check_provider_health(provider: &(impl LocalEpgProvider + Sync)) -> ProviderHealth {
    let Some(channel) = provider.channels().first() else {
        tracing::warn!("Provider has no channels to check");
        return ProviderHealth::unhealthy("no channels configured");
    };

    let today = provider.today();
    match provider.fetch_epg(channel.id, channel.name, today).await {
        Ok(programs) => {
            tracing::debug!(
                provider_channel_id = channel.id,
                %today,
                fetched = programs.len(),
                "Health check passed"
            );
            ProviderHealth::ok()
        }
        Err(e) => {
            tracing::warn!(
                provider_channel_id = channel.id,
                error = %e,
                "Health check failed"
            );
            ProviderHealth::unhealthy(format!("fetch_epg failed: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::NaiveDate;

    use super::*;
    use crate::batch::{BatchOptions, BatchOutcome};
    use crate::error::EpgError;
    use crate::model::{ChannelMappingInfo, Program, ProviderChannel};

    static CHECK_CHANNELS: [ProviderChannel; 2] = [
        ProviderChannel::new("Check One", "p1"),
        ProviderChannel::new("Check Two", "p2"),
    ];

    /// Provider whose fetch outcome is fixed at construction.
    #[derive(Debug)]
    struct FixedProvider {
        fail: bool,
        channels: &'static [ProviderChannel],
    }

    impl LocalEpgProvider for FixedProvider {
        fn id(&self) -> &str {
            "fixed"
        }

        fn channels(&self) -> &[ProviderChannel] {
            self.channels
        }

        fn today(&self) -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        }

        async fn health_check(&self) -> ProviderHealth {
            check_provider_health(self).await
        }

        async fn fetch_epg(
            &self,
            provider_channel_id: &str,
            _channel_id: &str,
            date: NaiveDate,
        ) -> Result<Vec<Program>, EpgError> {
            assert_eq!(provider_channel_id, "p1", "health check must use the first channel");
            assert_eq!(date, self.today(), "health check must use the provider date");
            if self.fail {
                return Err(EpgError::HttpStatus {
                    provider: String::from("fixed"),
                    status: 500,
                });
            }
            Ok(Vec::new())
        }

        async fn fetch_epg_batch(
            &self,
            _mappings: &[ChannelMappingInfo],
            _date: NaiveDate,
            _options: &BatchOptions,
        ) -> BatchOutcome {
            BatchOutcome::default()
        }

        fn parse_epg_response(
            &self,
            _data: &[u8],
            _provider_channel_id: &str,
            _channel_id: &str,
            _date: &str,
        ) -> Result<Vec<Program>, EpgError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_health_check_ok() {
        // Arrange
        let provider = FixedProvider {
            fail: false,
            channels: &CHECK_CHANNELS,
        };

        // Act
        let health = provider.health_check().await;

        // Assert
        assert_eq!(health, ProviderHealth::ok());
    }

    #[tokio::test]
    async fn test_health_check_failure_is_captured() {
        // Arrange
        let provider = FixedProvider {
            fail: true,
            channels: &CHECK_CHANNELS,
        };

        // Act
        let health = provider.health_check().await;

        // Assert
        assert!(!health.healthy);
        assert!(!health.message.is_empty());
        assert!(health.message.contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_health_check_without_channels() {
        // Arrange
        let provider = FixedProvider {
            fail: false,
            channels: &[],
        };

        // Act
        let health = provider.health_check().await;

        // Assert
        assert!(!health.healthy);
        assert_eq!(health.message, "no channels configured");
    }
}
