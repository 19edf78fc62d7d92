//! Multi-channel EPG fetching with per-channel failure isolation.

use std::time::Duration;

use chrono::NaiveDate;
use futures::{StreamExt, stream};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::EpgError;
use crate::model::{ChannelMappingInfo, DEFAULT_MAX_CONCURRENCY, Program};
use crate::provider::LocalEpgProvider;

/// Knobs for [`fetch_epg_batch`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum number of fetches in flight (clamped to at least 1).
    pub max_concurrency: usize,
    /// Cancels every outstanding and not-yet-started fetch.
    pub cancel: CancellationToken,
    /// Shared deadline for the whole batch, measured from its start.
    pub deadline: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }
}

impl BatchOptions {
    /// Sets the fan-out limit.
    #[must_use]
    pub const fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    /// Uses the given cancellation token.
    #[must_use]
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Sets a shared batch deadline.
    #[must_use]
    pub const fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// One channel that could not be fetched.
#[derive(Debug)]
pub struct ChannelFailure {
    /// Provider-local channel ID.
    pub provider_channel_id: String,
    /// Canonical channel ID.
    pub channel_id: String,
    /// Why the fetch failed.
    pub error: EpgError,
}

/// Best-effort result of a batch fetch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Union of all successfully parsed programs (no cross-channel order).
    pub programs: Vec<Program>,
    /// Channels that failed, with their errors.
    pub failures: Vec<ChannelFailure>,
}

impl BatchOutcome {
    /// Returns `true` if every channel was fetched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetches every mapping for `date`, at most `options.max_concurrency` at a time.
///
/// A failing channel never aborts the batch: its error is recorded in
/// [`BatchOutcome::failures`] and the remaining channels continue. When
/// `options.cancel` fires or the deadline passes, in-flight fetches are
/// dropped and remaining ones are not started; both are recorded as
/// failures while already-completed channels are kept.
#[instrument(skip_all, fields(provider = provider.id(), channels = mappings.len(), %date))]
pub async fn fetch_epg_batch(
    provider: &(impl LocalEpgProvider + Sync),
    mappings: &[ChannelMappingInfo],
    date: NaiveDate,
    options: &BatchOptions,
) -> BatchOutcome {
    let limit = options.max_concurrency.max(1);
    let deadline = options
        .deadline
        .and_then(|d| Instant::now().checked_add(d));

    let results: Vec<(&ChannelMappingInfo, Result<Vec<Program>, EpgError>)> =
        stream::iter(mappings)
            .map(|mapping| async move {
                let result = fetch_one(provider, mapping, date, &options.cancel, deadline).await;
                (mapping, result)
            })
            .buffer_unordered(limit)
            .collect()
            .await;

    let mut outcome = BatchOutcome::default();
    for (mapping, result) in results {
        match result {
            Ok(programs) => {
                tracing::debug!(
                    provider_channel_id = %mapping.provider_channel_id,
                    channel_id = %mapping.channel_id,
                    fetched = programs.len(),
                    "Channel fetched"
                );
                outcome.programs.extend(programs);
            }
            Err(error) => {
                tracing::warn!(
                    provider_channel_id = %mapping.provider_channel_id,
                    channel_id = %mapping.channel_id,
                    error = %error,
                    "Channel fetch failed"
                );
                outcome.failures.push(ChannelFailure {
                    provider_channel_id: mapping.provider_channel_id.clone(),
                    channel_id: mapping.channel_id.clone(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        programs = outcome.programs.len(),
        failed = outcome.failures.len(),
        "EPG batch completed"
    );
    outcome
}

/// Runs one fetch raced against cancellation and the batch deadline.
async fn fetch_one(
    provider: &(impl LocalEpgProvider + Sync),
    mapping: &ChannelMappingInfo,
    date: NaiveDate,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> Result<Vec<Program>, EpgError> {
    if cancel.is_cancelled() {
        return Err(EpgError::Cancelled {
            provider: String::from(provider.id()),
        });
    }

    let expiry = async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(EpgError::Cancelled {
            provider: String::from(provider.id()),
        }),
        () = expiry => Err(EpgError::DeadlineExceeded {
            provider: String::from(provider.id()),
        }),
        result = provider.fetch_epg(&mapping.provider_channel_id, &mapping.channel_id, date) => result,
    }
}
