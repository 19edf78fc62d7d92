//! Hebei Radio and Television schedule provider.
//!
//! One `POST` per channel and day; the response groups entries by date
//! and expresses times in China Standard Time.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::batch::{self, BatchOptions, BatchOutcome};
use crate::error::EpgError;
use crate::health::check_provider_health;
use crate::model::{ChannelMappingInfo, Program, ProviderChannel, ProviderConfig, ProviderHealth};
use crate::provider::LocalEpgProvider;
use crate::timezone::{DATE_FORMAT, SourceTimezone, UTC8_LOCATION};
use crate::transport::HttpTransport;

/// Registered provider name.
pub const PROVIDER_ID: &str = "hebei";

/// Schedule endpoint path.
const SCHEDULE_PATH: &str = "/spidercrms/api/live/liveShowSet/findNoPage";

/// Tenant identifier required by the upstream, sent as header and body field.
const TENANT_ID: &str = "0d91d6cfb98f5b206ac1e752757fc5a9";

/// Header carrying [`TENANT_ID`].
const TENANT_HEADER: &str = "Tenantid";

/// `state` value of a successful response.
const SUCCESS_STATE: i64 = 200;

/// Channel catalog. The first entry is the channel the health check fetches.
static CHANNELS: [ProviderChannel; 7] = [
    ProviderChannel::new("河北卫视", "462"),
    ProviderChannel::new("河北经济生活", "114"),
    ProviderChannel::new("河北三农", "118"),
    ProviderChannel::new("河北都市", "62"),
    ProviderChannel::new("河北影视剧", "334"),
    ProviderChannel::new("河北少儿科教", "70"),
    ProviderChannel::new("河北文旅公共", "338"),
];

/// Request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleRequest<'a> {
    day: &'a str,
    day_end: &'a str,
    source_id: &'a str,
    tenant_id: &'a str,
}

/// Response envelope.
#[derive(Debug, Deserialize)]
struct ScheduleResponse {
    /// Upstream status code (200 = success).
    #[serde(default)]
    state: i64,
    /// Upstream message.
    #[serde(default)]
    message: Option<String>,
    /// Upstream success flag (informational; `state` is authoritative).
    #[serde(default)]
    success: bool,
    /// Entries grouped by `YYYY-MM-DD`.
    #[serde(rename = "Data", alias = "data", default)]
    data: Option<HashMap<String, Vec<ScheduleEntry>>>,
}

/// One broadcast slot as sent by the upstream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleEntry {
    #[serde(default)]
    start_date_time: Option<String>,
    #[serde(default)]
    end_date_time: Option<String>,
    #[serde(rename = "Name", alias = "name", default)]
    name: Option<String>,
}

/// Hebei Radio and Television provider.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct HebeiProvider {
    /// HTTP transport bound to the configured base URL.
    transport: HttpTransport,
    /// Source timezone (UTC+8).
    timezone: SourceTimezone,
}

impl HebeiProvider {
    /// Creates the provider from its runtime config.
    ///
    /// # Errors
    ///
    /// - The source timezone cannot be resolved.
    /// - `base_url` is missing or invalid.
    /// - The HTTP client fails to build.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let timezone = SourceTimezone::resolve(UTC8_LOCATION)?;

        let base_url = config
            .base_url
            .as_deref()
            .with_context(|| format!("base_url is required for provider {PROVIDER_ID}"))?;
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid base_url: {base_url}"))?;

        let mut builder = HttpTransport::builder(PROVIDER_ID)
            .base_url(base_url)
            .timeout(config.timeout())
            .min_interval(config.min_interval());
        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        let transport = builder.build()?;

        Ok(Self {
            transport,
            timezone,
        })
    }

    /// Static channel catalog.
    #[must_use]
    pub const fn channel_list() -> &'static [ProviderChannel] {
        &CHANNELS
    }

    /// Converts one upstream entry, or explains why it is unusable.
    fn to_program(
        &self,
        entry: ScheduleEntry,
        channel_id: &str,
        date: &str,
    ) -> Result<Program, EpgError> {
        let (start_time, end_time) = self
            .timezone
            .parse_range(
                entry.start_date_time.as_deref(),
                entry.end_date_time.as_deref(),
            )
            .map_err(|e| EpgError::EntryDateRange {
                channel_id: String::from(channel_id),
                date: String::from(date),
                reason: e.to_string(),
            })?;

        Ok(Program {
            channel_id: String::from(channel_id),
            title: entry.name.unwrap_or_default(),
            start_time,
            end_time,
            original_timezone: String::from(self.timezone.name()),
            provider_id: String::from(PROVIDER_ID),
        })
    }
}

impl LocalEpgProvider for HebeiProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn channels(&self) -> &[ProviderChannel] {
        &CHANNELS
    }

    fn today(&self) -> NaiveDate {
        self.timezone.today()
    }

    async fn health_check(&self) -> ProviderHealth {
        check_provider_health(self).await
    }

    #[instrument(
        skip_all,
        fields(provider = PROVIDER_ID, provider_channel_id = %provider_channel_id, %date)
    )]
    async fn fetch_epg(
        &self,
        provider_channel_id: &str,
        channel_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Program>, EpgError> {
        let day = date.format(DATE_FORMAT).to_string();
        let body = ScheduleRequest {
            day: &day,
            day_end: &day,
            source_id: provider_channel_id,
            tenant_id: TENANT_ID,
        };

        let raw = self
            .transport
            .post_json(SCHEDULE_PATH, &[(TENANT_HEADER, TENANT_ID)], &body)
            .await?;

        self.parse_epg_response(&raw, provider_channel_id, channel_id, &day)
    }

    async fn fetch_epg_batch(
        &self,
        mappings: &[ChannelMappingInfo],
        date: NaiveDate,
        options: &BatchOptions,
    ) -> BatchOutcome {
        batch::fetch_epg_batch(self, mappings, date, options).await
    }

    fn parse_epg_response(
        &self,
        data: &[u8],
        provider_channel_id: &str,
        channel_id: &str,
        date: &str,
    ) -> Result<Vec<Program>, EpgError> {
        let response: ScheduleResponse =
            serde_json::from_slice(data).map_err(|source| EpgError::ParseFailed {
                provider: String::from(PROVIDER_ID),
                source,
            })?;

        if response.state != SUCCESS_STATE {
            return Err(EpgError::ProviderApi {
                provider: String::from(PROVIDER_ID),
                code: response.state.to_string(),
                message: response.message.unwrap_or_default(),
            });
        }

        // Other date buckets in the same payload are ignored.
        let entries = response
            .data
            .and_then(|mut days| days.remove(date))
            .unwrap_or_default();

        let mut programs = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match self.to_program(entry, channel_id, date) {
                Ok(program) => programs.push(program),
                Err(e) => {
                    tracing::warn!(
                        provider = PROVIDER_ID,
                        provider_channel_id,
                        index,
                        error = %e,
                        "Skipping schedule entry"
                    );
                }
            }
        }

        tracing::debug!(
            provider = PROVIDER_ID,
            provider_channel_id,
            date,
            success = response.success,
            parsed = programs.len(),
            "Schedule parsed"
        );
        Ok(programs)
    }
}
