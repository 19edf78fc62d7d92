//! `EpgProvider` trait definition.
#![allow(clippy::future_not_send)]

use chrono::NaiveDate;

use crate::batch::{BatchOptions, BatchOutcome};
use crate::error::EpgError;
use crate::model::{ChannelMappingInfo, Program, ProviderChannel, ProviderHealth};

/// Contract every EPG provider implements.
///
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
/// Implementations are expected to delegate `health_check` to
/// [`crate::health::check_provider_health`] and `fetch_epg_batch` to
/// [`crate::batch::fetch_epg_batch`].
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(EpgProvider: Send)]
pub trait LocalEpgProvider {
    /// Provider ID (e.g. `"hebei"`), stamped on every produced `Program`.
    fn id(&self) -> &str;

    /// Static channel catalog.
    fn channels(&self) -> &[ProviderChannel];

    /// Current calendar date in the provider's source timezone.
    fn today(&self) -> NaiveDate;

    /// Checks the provider with one real fetch. Never fails.
    async fn health_check(&self) -> ProviderHealth;

    /// Fetches and parses one channel for one calendar day.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request fails, `ParseFailed` if the
    /// payload is malformed, or `ProviderApi` if the upstream rejects it.
    async fn fetch_epg(
        &self,
        provider_channel_id: &str,
        channel_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Program>, EpgError>;

    /// Fetches several channels for one date, isolating per-channel failures.
    async fn fetch_epg_batch(
        &self,
        mappings: &[ChannelMappingInfo],
        date: NaiveDate,
        options: &BatchOptions,
    ) -> BatchOutcome;

    /// Decodes a raw response body into programs for `date` (`YYYY-MM-DD`).
    ///
    /// Pure: performs no I/O. Entries with unusable timestamps are logged
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Returns `ParseFailed` if the body does not match the provider's
    /// schema, or `ProviderApi` if it carries a non-success status.
    fn parse_epg_response(
        &self,
        data: &[u8],
        provider_channel_id: &str,
        channel_id: &str,
        date: &str,
    ) -> Result<Vec<Program>, EpgError>;
}
