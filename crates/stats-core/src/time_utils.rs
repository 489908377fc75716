use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{Result, StatsError};
use crate::models::MonthBucket;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── CalendarFields ────────────────────────────────────────────────────────────

/// Calendar fields derived from one instant in a particular timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields {
    pub year: i32,
    pub month_bucket: MonthBucket,
    pub hour_of_day: u32,
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Parses export timestamps and derives calendar fields in one timezone.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    tz: Tz,
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self::utc()
    }
}

impl TimezoneHandler {
    /// Handler that derives fields in UTC, the zone the export is written in.
    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    /// Create a handler for an IANA timezone name.
    ///
    /// `"auto"` resolves to the system timezone. Unknown names are rejected.
    pub fn try_new(tz_name: &str) -> Result<Self> {
        let resolved = if tz_name.eq_ignore_ascii_case("auto") {
            get_system_timezone()
        } else {
            tz_name.to_string()
        };
        let tz = resolved
            .parse::<Tz>()
            .map_err(|_| StatsError::InvalidArgument(format!("unknown timezone \"{}\"", tz_name)))?;
        debug!("TimezoneHandler: deriving calendar fields in {}", tz.name());
        Ok(Self { tz })
    }

    /// Parse an ISO 8601 / RFC 3339 timestamp string into a UTC [`DateTime`].
    ///
    /// The export writes `2024-01-01T10:00:00Z`; any fixed offset is accepted
    /// too. Naive date-times are interpreted in the handler's timezone.
    pub fn parse_timestamp(&self, s: &str) -> Result<DateTime<Utc>> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(StatsError::TimestampParse(s.to_string()));
        }

        let normalised = if let Some(stripped) = trimmed.strip_suffix('Z') {
            format!("{}+00:00", stripped)
        } else {
            trimmed.to_string()
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Ok(dt.with_timezone(&Utc));
        }

        const FMTS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
        ];
        for fmt in FMTS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                if let Some(dt) = self.resolve_local(naive) {
                    return Ok(dt);
                }
            }
        }

        Err(StatsError::TimestampParse(s.to_string()))
    }

    /// Map a wall-clock time in the handler's zone to UTC.
    ///
    /// A time repeated by a fall-back transition resolves to its earlier
    /// occurrence. A time skipped by a spring-forward transition is read with
    /// the offset in effect before the gap, landing after the gap.
    fn resolve_local(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => {
                let before = self
                    .tz
                    .from_local_datetime(&(naive - Duration::hours(3)))
                    .earliest()?;
                let offset = before.offset().fix().local_minus_utc();
                Some(Utc.from_utc_datetime(&(naive - Duration::seconds(i64::from(offset)))))
            }
        }
    }

    /// Year, month bucket and hour of day of `dt` in the handler's timezone.
    pub fn calendar_fields(&self, dt: DateTime<Utc>) -> CalendarFields {
        let local = dt.with_timezone(&self.tz);
        CalendarFields {
            year: local.year(),
            month_bucket: MonthBucket::new(local.year(), local.month()),
            hour_of_day: local.hour(),
        }
    }

    /// Expose the configured timezone.
    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
