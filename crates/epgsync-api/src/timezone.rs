//! Source timezone resolution and local timestamp normalization.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::error::EpgError;

/// Layout of provider-local timestamps (`2024-01-10 20:00:00`).
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout of request dates and response date keys.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// IANA name of UTC+8 (China Standard Time).
pub const UTC8_LOCATION: &str = "Asia/Shanghai";

/// Why a local timestamp could not be turned into an instant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocalTimeError {
    /// Field absent or `null`.
    #[error("missing {field}")]
    Missing {
        /// Which side of the range.
        field: &'static str,
    },
    /// Text does not match [`LOCAL_DATETIME_FORMAT`].
    #[error("malformed timestamp {value:?}: {source}")]
    Malformed {
        /// Offending text.
        value: String,
        /// chrono parse error.
        #[source]
        source: chrono::ParseError,
    },
    /// Local time falls in a DST gap.
    #[error("nonexistent local time {value:?} in {zone}")]
    Nonexistent {
        /// Offending text.
        value: String,
        /// Zone name.
        zone: &'static str,
    },
    /// End is not after start.
    #[error("end {end} is not after start {start}")]
    NonPositiveRange {
        /// Normalized start.
        start: DateTime<Utc>,
        /// Normalized end.
        end: DateTime<Utc>,
    },
}

/// A provider's fixed source timezone, resolved once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTimezone {
    tz: Tz,
}

impl SourceTimezone {
    /// Resolves an IANA timezone name.
    ///
    /// # Errors
    ///
    /// Returns [`EpgError::TimezoneConfig`] if the name is unknown.
    pub fn resolve(name: &str) -> Result<Self, EpgError> {
        Tz::from_str(name)
            .map(|tz| Self { tz })
            .map_err(|e| EpgError::TimezoneConfig {
                name: String::from(name),
                reason: e.to_string(),
            })
    }

    /// IANA name, recorded as `Program::original_timezone`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    /// Current calendar date in this zone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// Interprets a local wall-clock time in this zone.
    ///
    /// Ambiguous times (DST fold) resolve to the earlier instant;
    /// nonexistent times (DST gap) yield `None`.
    #[must_use]
    pub fn localize(&self, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
        naive
            .and_local_timezone(self.tz)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Parses one `YYYY-MM-DD HH:MM:SS` local timestamp into UTC.
    ///
    /// # Errors
    ///
    /// Returns [`LocalTimeError`] if the text is malformed or names a
    /// nonexistent local time.
    pub fn parse_local(&self, value: &str) -> Result<DateTime<Utc>, LocalTimeError> {
        let naive = NaiveDateTime::parse_from_str(value.trim(), LOCAL_DATETIME_FORMAT).map_err(
            |source| LocalTimeError::Malformed {
                value: String::from(value),
                source,
            },
        )?;
        self.localize(&naive)
            .ok_or_else(|| LocalTimeError::Nonexistent {
                value: String::from(value),
                zone: self.name(),
            })
    }

    /// Parses a start/end pair and checks `start < end`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalTimeError`] if either side is missing or invalid,
    /// or if the range is empty or inverted.
    pub fn parse_range(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), LocalTimeError> {
        let start = self.parse_local(start.ok_or(LocalTimeError::Missing {
            field: "start time",
        })?)?;
        let end = self.parse_local(end.ok_or(LocalTimeError::Missing {
            field: "end time",
        })?)?;
        if end <= start {
            return Err(LocalTimeError::NonPositiveRange { start, end });
        }
        Ok((start, end))
    }
}
