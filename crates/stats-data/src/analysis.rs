//! The listening-history engine.
//!
//! [`ListeningAnalyzer`] loads and normalizes a set of export sources once on
//! construction and then answers read-only queries over the owned record set.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use chrono::Utc;
use stats_core::error::Result;
use stats_core::models::{
    FieldSelector, HourCount, LabelCount, LabelHours, ListeningSummary, ListeningTime, MonthHours,
    PlaybackRecord, PodcastRecord, YearFilter,
};
use stats_core::time_utils::TimezoneHandler;
use tracing::{info, warn};

use crate::aggregator::PlaybackAggregator;
use crate::normalizer::{Normalizer, SkippedRow};
use crate::reader::{load_dir, load_sources, NamedSource, RawHistory};

// ── Public types ──────────────────────────────────────────────────────────────

/// Construction options for [`ListeningAnalyzer`].
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// IANA timezone in which year, month and hour buckets are derived.
    /// `"auto"` uses the system timezone.
    pub timezone: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

/// What happened while the engine was built.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// ISO-8601 timestamp when the engine was built.
    pub generated_at: String,
    /// IANA name of the zone calendar fields were derived in.
    pub timezone: String,
    pub audio_sources: usize,
    pub video_sources: usize,
    /// Raw audio rows read before normalization.
    pub audio_rows_read: usize,
    /// Raw video rows read before normalization.
    pub video_rows_read: usize,
    /// Rows dropped during normalization, in source order.
    pub skipped: Vec<SkippedRow>,
    /// Wall-clock seconds spent parsing sources.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent normalizing rows.
    pub normalize_time_seconds: f64,
}

impl LoadReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// An owned, immutable listening history with the dashboard query surface.
///
/// Queries take `&self` and never modify the record set, so one instance
/// can be shared across threads for concurrent reads.
#[derive(Debug, Clone)]
pub struct ListeningAnalyzer {
    records: Vec<PlaybackRecord>,
    podcasts: Vec<PodcastRecord>,
    report: LoadReport,
}

impl ListeningAnalyzer {
    /// Build an engine from in-memory sources (e.g. uploaded files).
    pub fn from_sources(sources: Vec<NamedSource>, config: &AnalyzerConfig) -> Result<Self> {
        let tz = TimezoneHandler::try_new(&config.timezone)?;
        let load_start = std::time::Instant::now();
        let history = load_sources(sources)?;
        Ok(Self::from_history(history, tz, load_start.elapsed().as_secs_f64()))
    }

    /// Build an engine from every streaming-history file under `dir`.
    pub fn from_dir(dir: &Path, config: &AnalyzerConfig) -> Result<Self> {
        let tz = TimezoneHandler::try_new(&config.timezone)?;
        let load_start = std::time::Instant::now();
        let history = load_dir(dir)?;
        Ok(Self::from_history(history, tz, load_start.elapsed().as_secs_f64()))
    }

    fn from_history(history: RawHistory, tz: TimezoneHandler, load_time: f64) -> Self {
        let audio_sources = history.audio.len();
        let video_sources = history.video.len();
        let audio_rows_read = history.audio_row_count();
        let video_rows_read = history.video_row_count();

        let normalize_start = std::time::Instant::now();
        let normalizer = Normalizer::new(tz);
        let (records, mut skipped) = normalizer.normalize_audio(history.audio);
        let (podcasts, skipped_video) = normalizer.normalize_podcasts(history.video);
        skipped.extend(skipped_video);
        let normalize_time = normalize_start.elapsed().as_secs_f64();

        if !skipped.is_empty() {
            warn!(
                "Skipped {} of {} rows during normalization",
                skipped.len(),
                audio_rows_read + video_rows_read
            );
        }
        info!(
            "Loaded {} plays and {} podcast episodes from {} sources",
            records.len(),
            podcasts.len(),
            audio_sources + video_sources
        );

        Self {
            records,
            podcasts,
            report: LoadReport {
                generated_at: Utc::now().to_rfc3339(),
                timezone: tz.timezone().name().to_string(),
                audio_sources,
                video_sources,
                audio_rows_read,
                video_rows_read,
                skipped,
                load_time_seconds: load_time,
                normalize_time_seconds: normalize_time,
            },
        }
    }

    // ── Record access ─────────────────────────────────────────────────────────

    pub fn records(&self) -> &[PlaybackRecord] {
        &self.records
    }

    pub fn podcasts(&self) -> &[PodcastRecord] {
        &self.podcasts
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn skipped_row_count(&self) -> usize {
        self.report.skipped_count()
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// See [`PlaybackAggregator::top_by_single_field`].
    pub fn top_by_single_field(
        &self,
        count: usize,
        year: YearFilter,
        selector: FieldSelector,
    ) -> Result<Vec<LabelCount>> {
        PlaybackAggregator::top_by_single_field(&self.records, count, year, selector)
    }

    pub fn top_artists_by_playtime(&self, count: usize, year: YearFilter) -> Result<Vec<LabelHours>> {
        PlaybackAggregator::top_artists_by_playtime(&self.records, count, year)
    }

    /// See [`PlaybackAggregator::monthly_listening`].
    pub fn monthly_listening(&self, year: YearFilter, count: usize) -> Result<Vec<MonthHours>> {
        PlaybackAggregator::monthly_listening(&self.records, year, count)
    }

    /// Unrounded music listening seconds.
    pub fn total_seconds(&self, year: YearFilter) -> f64 {
        PlaybackAggregator::total_seconds(&self.records, year)
    }

    pub fn total_hours_listened(&self, year: YearFilter) -> f64 {
        PlaybackAggregator::total_hours_listened(&self.records, year)
    }

    /// Total listening time split into hours, minutes and seconds.
    pub fn listening_time(&self, year: YearFilter) -> ListeningTime {
        ListeningTime::from_seconds(self.total_seconds(year))
    }

    pub fn top_hours_of_day(&self, year: YearFilter, count: usize) -> Result<Vec<HourCount>> {
        PlaybackAggregator::top_hours_of_day(&self.records, year, count)
    }

    pub fn top_podcasts(&self, year: YearFilter, count: usize) -> Result<Vec<LabelHours>> {
        PlaybackAggregator::top_podcasts(&self.podcasts, year, count)
    }

    // ── Summary counts ────────────────────────────────────────────────────────

    pub fn distinct_artist_count(&self) -> usize {
        self.distinct(FieldSelector::Artists)
    }

    /// Distinct tracks, identified by their `"{track} - {artist}"` label.
    pub fn distinct_track_count(&self) -> usize {
        self.distinct(FieldSelector::Songs)
    }

    pub fn distinct_album_count(&self) -> usize {
        self.distinct(FieldSelector::Albums)
    }

    /// Years with at least one music play, ascending.
    pub fn available_years(&self) -> Vec<i32> {
        self.records
            .iter()
            .map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn summary(&self) -> ListeningSummary {
        ListeningSummary {
            total_plays: self.records.len(),
            distinct_artists: self.distinct_artist_count(),
            distinct_tracks: self.distinct_track_count(),
            distinct_albums: self.distinct_album_count(),
            total_hours: self.total_hours_listened(YearFilter::All),
            podcast_episodes: self.podcasts.len(),
            skipped_rows: self.skipped_row_count(),
            first_played: self.records.iter().map(|r| r.timestamp).min(),
            last_played: self.records.iter().map(|r| r.timestamp).max(),
        }
    }

    fn distinct(&self, selector: FieldSelector) -> usize {
        self.records
            .iter()
            .filter_map(|r| selector.select(r))
            .collect::<HashSet<_>>()
            .len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
