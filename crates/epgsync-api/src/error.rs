//! EPG pipeline error taxonomy.

use thiserror::Error;

/// Errors produced while fetching and normalizing EPG data.
///
/// Every per-call variant carries the ID of the provider that raised it.
/// `EntryDateRange` is recovered inside the response parsers and only
/// surfaces in logs.
#[derive(Debug, Error)]
#[allow(clippy::module_name_repetitions)]
pub enum EpgError {
    /// The upstream could not be reached or the connection failed.
    #[error("{provider}: transport error: {source}")]
    Transport {
        /// Provider ID.
        provider: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered with a non-success HTTP status.
    #[error("{provider}: upstream returned HTTP {status}")]
    HttpStatus {
        /// Provider ID.
        provider: String,
        /// HTTP status code.
        status: u16,
    },

    /// The request URL could not be built from the configured base URL.
    #[error("{provider}: invalid request URL: {source}")]
    InvalidUrl {
        /// Provider ID.
        provider: String,
        /// URL join error.
        #[source]
        source: url::ParseError,
    },

    /// The request body could not be serialized.
    #[error("{provider}: failed to encode request body: {source}")]
    RequestEncode {
        /// Provider ID.
        provider: String,
        /// JSON encoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The response body does not match the provider's schema.
    #[error("{provider}: failed to decode response: {source}")]
    ParseFailed {
        /// Provider ID.
        provider: String,
        /// JSON decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The upstream explicitly rejected the request.
    #[error("{provider}: API error: code={code}, message={message}")]
    ProviderApi {
        /// Provider ID.
        provider: String,
        /// Upstream status code, verbatim.
        code: String,
        /// Upstream message, verbatim.
        message: String,
    },

    /// A single schedule entry has unusable timestamps.
    #[error("channel {channel_id}: invalid schedule entry on {date}: {reason}")]
    EntryDateRange {
        /// Canonical channel ID.
        channel_id: String,
        /// Requested date.
        date: String,
        /// What was wrong with the entry.
        reason: String,
    },

    /// The provider's declared source timezone is not a known IANA name.
    #[error("cannot resolve timezone {name:?}: {reason}")]
    TimezoneConfig {
        /// Configured timezone name.
        name: String,
        /// Resolver error.
        reason: String,
    },

    /// The batch was cancelled before this fetch finished.
    #[error("{provider}: fetch cancelled")]
    Cancelled {
        /// Provider ID.
        provider: String,
    },

    /// The shared batch deadline passed before this fetch finished.
    #[error("{provider}: batch deadline exceeded")]
    DeadlineExceeded {
        /// Provider ID.
        provider: String,
    },
}

impl EpgError {
    /// Returns `true` for failures reaching the upstream (network or HTTP status).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::HttpStatus { .. })
    }

    /// Returns `true` if the fetch was aborted by cancellation or deadline.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::DeadlineExceeded { .. })
    }

    /// Provider ID attached to this error, if any.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Transport { provider, .. }
            | Self::HttpStatus { provider, .. }
            | Self::InvalidUrl { provider, .. }
            | Self::RequestEncode { provider, .. }
            | Self::ParseFailed { provider, .. }
            | Self::ProviderApi { provider, .. }
            | Self::Cancelled { provider }
            | Self::DeadlineExceeded { provider } => Some(provider),
            Self::EntryDateRange { .. } | Self::TimezoneConfig { .. } => None,
        }
    }
}
