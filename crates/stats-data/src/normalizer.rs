//! Turns raw export rows into normalized playback records.
//!
//! Raw rows and normalized records are distinct types and the normalizer
//! consumes the raw rows, so projection and unit conversion happen exactly
//! once per row.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use stats_core::data_processors::{DurationConverter, LabelBuilder};
use stats_core::models::{PlaybackRecord, PodcastRecord};
use stats_core::time_utils::{CalendarFields, TimezoneHandler};
use thiserror::Error;
use tracing::warn;

use crate::reader::RawSource;

// ── Raw row ───────────────────────────────────────────────────────────────────

/// The subset of an export row used downstream. Every other field
/// (connection metadata, offline/incognito flags, URIs, audiobook fields)
/// is dropped on deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlayback {
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub ms_played: Option<f64>,
    #[serde(default, rename = "master_metadata_album_artist_name")]
    pub artist_name: Option<String>,
    #[serde(default, rename = "master_metadata_track_name")]
    pub track_name: Option<String>,
    #[serde(default, rename = "master_metadata_album_album_name")]
    pub album_name: Option<String>,
    #[serde(default)]
    pub episode_name: Option<String>,
    #[serde(default)]
    pub episode_show_name: Option<String>,
}

// ── Row defects ───────────────────────────────────────────────────────────────

/// Why a single row was left out of the normalized set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowDefect {
    #[error("missing timestamp")]
    MissingTimestamp,

    #[error("unparseable timestamp \"{0}\"")]
    UnparseableTimestamp(String),

    #[error("missing ms_played")]
    MissingDuration,

    #[error("negative ms_played ({0})")]
    NegativeDuration(f64),

    /// The row object has a field of the wrong JSON type.
    #[error("invalid row: {0}")]
    InvalidShape(String),
}

/// A row dropped during normalization, with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub source_name: String,
    /// Zero-based index of the row within its source.
    pub index: usize,
    pub reason: RowDefect,
}

// ── Normalizer ────────────────────────────────────────────────────────────────

/// Fields every normalized row shares, whichever stream it came from.
struct PreparedRow {
    raw: RawPlayback,
    timestamp: DateTime<Utc>,
    seconds_played: f64,
    calendar: CalendarFields,
}

/// Converts raw rows into [`PlaybackRecord`]s and [`PodcastRecord`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    tz: TimezoneHandler,
}

impl Normalizer {
    /// Derive calendar fields in the timezone of `tz`.
    pub fn new(tz: TimezoneHandler) -> Self {
        Self { tz }
    }

    /// Normalize the audio stream. Defective rows are skipped and reported.
    pub fn normalize_audio(&self, sources: Vec<RawSource>) -> (Vec<PlaybackRecord>, Vec<SkippedRow>) {
        self.normalize_with(sources, |prepared| {
            let PreparedRow {
                raw,
                timestamp,
                seconds_played,
                calendar,
            } = prepared;
            let artist_name = LabelBuilder::clean(raw.artist_name);
            let track_name = LabelBuilder::clean(raw.track_name);
            let album_name = LabelBuilder::clean(raw.album_name);
            let track_with_artist =
                LabelBuilder::composite(track_name.as_deref(), artist_name.as_deref());
            let album_with_artist =
                LabelBuilder::composite(album_name.as_deref(), artist_name.as_deref());

            PlaybackRecord {
                timestamp,
                seconds_played,
                artist_name,
                track_name,
                album_name,
                year: calendar.year,
                month_bucket: calendar.month_bucket,
                hour_of_day: calendar.hour_of_day,
                track_with_artist,
                album_with_artist,
            }
        })
    }

    /// Normalize the video / podcast stream.
    pub fn normalize_podcasts(
        &self,
        sources: Vec<RawSource>,
    ) -> (Vec<PodcastRecord>, Vec<SkippedRow>) {
        self.normalize_with(sources, |prepared| PodcastRecord {
            timestamp: prepared.timestamp,
            seconds_played: prepared.seconds_played,
            show_name: LabelBuilder::clean(prepared.raw.episode_show_name),
            episode_name: LabelBuilder::clean(prepared.raw.episode_name),
            year: prepared.calendar.year,
            month_bucket: prepared.calendar.month_bucket,
            hour_of_day: prepared.calendar.hour_of_day,
        })
    }

    fn normalize_with<T>(
        &self,
        sources: Vec<RawSource>,
        build: impl Fn(PreparedRow) -> T,
    ) -> (Vec<T>, Vec<SkippedRow>) {
        let capacity = sources.iter().map(|s| s.rows.len()).sum();
        let mut records = Vec::with_capacity(capacity);
        let mut skipped = Vec::new();

        for source in sources {
            for (index, row) in source.rows.into_iter().enumerate() {
                match self.prepare(row) {
                    Ok(prepared) => records.push(build(prepared)),
                    Err(reason) => {
                        warn!("Skipping row {} of {}: {}", index, source.name, reason);
                        skipped.push(SkippedRow {
                            source_name: source.name.clone(),
                            index,
                            reason,
                        });
                    }
                }
            }
        }

        (records, skipped)
    }

    fn prepare(&self, row: Map<String, Value>) -> Result<PreparedRow, RowDefect> {
        let raw: RawPlayback = serde_json::from_value(Value::Object(row))
            .map_err(|e| RowDefect::InvalidShape(e.to_string()))?;

        let ts = raw.ts.as_deref().ok_or(RowDefect::MissingTimestamp)?;
        let timestamp = self
            .tz
            .parse_timestamp(ts)
            .map_err(|_| RowDefect::UnparseableTimestamp(ts.to_string()))?;

        let ms = raw.ms_played.ok_or(RowDefect::MissingDuration)?;
        if ms < 0.0 {
            return Err(RowDefect::NegativeDuration(ms));
        }

        Ok(PreparedRow {
            timestamp,
            seconds_played: DurationConverter::ms_to_seconds(ms),
            calendar: self.tz.calendar_fields(timestamp),
            raw,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
