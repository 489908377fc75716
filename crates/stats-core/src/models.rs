use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StatsError;

/// A calendar month identity used as a grouping key.
///
/// Ordering is by `(year, month)` so buckets sort chronologically across
/// year boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthBucket {
    pub year: i32,
    /// Calendar month, 1 = January.
    pub month: u32,
}

impl MonthBucket {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Display label, e.g. `"2024-03"`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A single music playback event after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRecord {
    /// UTC instant the play event was logged.
    pub timestamp: DateTime<Utc>,
    /// Duration listened, in seconds (fractional).
    pub seconds_played: f64,
    pub artist_name: Option<String>,
    pub track_name: Option<String>,
    pub album_name: Option<String>,
    /// Calendar year in the engine's timezone.
    pub year: i32,
    pub month_bucket: MonthBucket,
    /// Hour of day 0–23 in the engine's timezone.
    pub hour_of_day: u32,
    /// `"{track} - {artist}"`, absent when either side is absent.
    pub track_with_artist: Option<String>,
    /// `"{album} - {artist}"`, absent when either side is absent.
    pub album_with_artist: Option<String>,
}

/// A single podcast / video episode playback event after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodcastRecord {
    pub timestamp: DateTime<Utc>,
    pub seconds_played: f64,
    pub show_name: Option<String>,
    pub episode_name: Option<String>,
    pub year: i32,
    pub month_bucket: MonthBucket,
    pub hour_of_day: u32,
}

// ── Query parameters ──────────────────────────────────────────────────────────

/// Year restriction applied to every aggregation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearFilter {
    /// The full record set.
    #[default]
    All,
    /// Only records whose `year` equals the given value.
    Year(i32),
}

impl YearFilter {
    /// Whether a record from `year` passes this filter.
    pub fn matches(&self, year: i32) -> bool {
        match self {
            YearFilter::All => true,
            YearFilter::Year(y) => *y == year,
        }
    }
}

impl FromStr for YearFilter {
    type Err = StatsError;

    /// Accepts `"All"` (any casing) or an integer year such as `"2024"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(YearFilter::All);
        }
        trimmed
            .parse::<i32>()
            .map(YearFilter::Year)
            .map_err(|_| StatsError::InvalidFilter(s.to_string()))
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::All => write!(f, "All"),
            YearFilter::Year(y) => write!(f, "{}", y),
        }
    }
}

/// Which label a single-field top-N query groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldSelector {
    /// Group by artist name.
    Artists,
    /// Group by the `"{track} - {artist}"` composite label.
    Songs,
    /// Group by the `"{album} - {artist}"` composite label.
    Albums,
}

impl FieldSelector {
    pub const ALL: [FieldSelector; 3] = [
        FieldSelector::Artists,
        FieldSelector::Songs,
        FieldSelector::Albums,
    ];

    /// The label of `record` this selector groups by, if present.
    pub fn select<'a>(&self, record: &'a PlaybackRecord) -> Option<&'a str> {
        match self {
            FieldSelector::Artists => record.artist_name.as_deref(),
            FieldSelector::Songs => record.track_with_artist.as_deref(),
            FieldSelector::Albums => record.album_with_artist.as_deref(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldSelector::Artists => "Artists",
            FieldSelector::Songs => "Songs",
            FieldSelector::Albums => "Albums",
        }
    }
}

impl FromStr for FieldSelector {
    type Err = StatsError;

    /// Unknown names are rejected rather than mapped to a default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "artists" => Ok(FieldSelector::Artists),
            "songs" => Ok(FieldSelector::Songs),
            "albums" => Ok(FieldSelector::Albums),
            _ => Err(StatsError::InvalidArgument(format!(
                "unknown field selector \"{}\" (expected Artists, Songs or Albums)",
                s
            ))),
        }
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Query results ─────────────────────────────────────────────────────────────

/// A grouped label with its number of plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub plays: u64,
}

/// A grouped label with the hours spent on it, rounded to 2 dp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelHours {
    pub label: String,
    pub hours: f64,
    /// Unrounded total behind `hours`, for shares and further arithmetic.
    pub seconds: f64,
}

/// Listening hours within one calendar month, rounded to 2 dp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthHours {
    pub month: MonthBucket,
    pub hours: f64,
}

impl MonthHours {
    pub fn label(&self) -> String {
        self.month.label()
    }
}

/// Number of plays that started within one hour of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourCount {
    /// Hour of day 0–23.
    pub hour: u32,
    pub plays: u64,
}

/// A total duration split into whole hours, whole minutes and the seconds
/// remainder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ListeningTime {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: f64,
}

impl ListeningTime {
    /// Break `total_seconds` down; negative input is treated as zero.
    pub fn from_seconds(total_seconds: f64) -> Self {
        let total = total_seconds.max(0.0);
        let hours = (total / 3600.0).floor();
        let minutes = ((total - hours * 3600.0) / 60.0).floor();
        let seconds = total - hours * 3600.0 - minutes * 60.0;
        Self {
            hours: hours as u64,
            minutes: minutes as u64,
            seconds,
        }
    }
}

/// Headline counts over the normalized record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListeningSummary {
    /// Number of music playback records.
    pub total_plays: usize,
    pub distinct_artists: usize,
    /// Distinct `"{track} - {artist}"` labels.
    pub distinct_tracks: usize,
    /// Distinct `"{album} - {artist}"` labels.
    pub distinct_albums: usize,
    /// Total music hours, rounded to 2 dp.
    pub total_hours: f64,
    /// Number of podcast / video playback records.
    pub podcast_episodes: usize,
    /// Rows dropped during normalization.
    pub skipped_rows: usize,
    pub first_played: Option<DateTime<Utc>>,
    pub last_played: Option<DateTime<Utc>>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
