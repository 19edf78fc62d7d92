//! EPG provider library for epgsync.
//!
//! Fetches broadcast schedules from upstream provider APIs, normalizes
//! them into [`Program`] records with UTC timestamps, and fans out
//! multi-channel fetches with bounded concurrency.

/// Batch fetch orchestration.
pub mod batch;
/// Error taxonomy.
pub mod error;
/// Provider health check.
pub mod health;
/// Canonical data model.
pub mod model;
/// `EpgProvider` trait.
pub mod provider;
/// Built-in providers.
pub mod providers;
/// Provider registry.
pub mod registry;
/// Source timezone handling.
pub mod timezone;
/// Shared HTTP transport.
pub mod transport;

mod throttle;

pub use batch::{BatchOptions, BatchOutcome, ChannelFailure, fetch_epg_batch};
pub use error::EpgError;
pub use health::check_provider_health;
#[allow(clippy::module_name_repetitions)]
pub use model::{
    ChannelMappingInfo, Program, ProviderChannel, ProviderConfig, ProviderHealth,
};
#[allow(clippy::module_name_repetitions)]
pub use provider::{EpgProvider, LocalEpgProvider};
pub use registry::{Provider, ProviderConstructor, ProviderRegistry};
pub use timezone::SourceTimezone;
pub use transport::HttpTransport;
