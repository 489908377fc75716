//! Parameterized top-N and time-spent queries over normalized records.
//!
//! Every query takes a [`YearFilter`] and never mutates its input. Sums are
//! accumulated in unrounded seconds and only converted to rounded hours when
//! the result rows are built.

use std::collections::{BTreeMap, HashMap};
use std::ops::AddAssign;

use stats_core::data_processors::DurationConverter;
use stats_core::error::{Result, StatsError};
use stats_core::models::{
    FieldSelector, HourCount, LabelCount, LabelHours, MonthBucket, MonthHours, PlaybackRecord,
    PodcastRecord, YearFilter,
};

/// Hours in a day; `top_hours_of_day` clamps its count to this.
pub const HOURS_PER_DAY: usize = 24;

// ── FirstSeenTally ────────────────────────────────────────────────────────────

/// Per-label accumulator that remembers the order labels first appeared in,
/// so a stable sort afterwards breaks ties by first encounter.
struct FirstSeenTally<'a, V> {
    index: HashMap<&'a str, usize>,
    entries: Vec<(&'a str, V)>,
}

impl<'a, V: Default + AddAssign + Copy> FirstSeenTally<'a, V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn add(&mut self, label: &'a str, value: V) {
        let slot = *self.index.entry(label).or_insert_with(|| {
            self.entries.push((label, V::default()));
            self.entries.len() - 1
        });
        self.entries[slot].1 += value;
    }

    fn into_entries(self) -> Vec<(&'a str, V)> {
        self.entries
    }
}

// ── PlaybackAggregator ────────────────────────────────────────────────────────

/// Stateless helper that answers the dashboard queries.
pub struct PlaybackAggregator;

impl PlaybackAggregator {
    /// Most played labels for `selector`, as `(label, plays)`.
    ///
    /// Records without the selected label are not counted. Sorted by plays
    /// descending; equal counts keep first-encountered order.
    pub fn top_by_single_field(
        records: &[PlaybackRecord],
        count: usize,
        year: YearFilter,
        selector: FieldSelector,
    ) -> Result<Vec<LabelCount>> {
        validate_count(count)?;

        let mut tally = FirstSeenTally::<u64>::new();
        for record in filtered(records, year) {
            if let Some(label) = selector.select(record) {
                tally.add(label, 1);
            }
        }

        let mut entries = tally.into_entries();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(count);

        Ok(entries
            .into_iter()
            .map(|(label, plays)| LabelCount {
                label: label.to_string(),
                plays,
            })
            .collect())
    }

    /// Artists ranked by total listening time, as `(artist, hours)`.
    pub fn top_artists_by_playtime(
        records: &[PlaybackRecord],
        count: usize,
        year: YearFilter,
    ) -> Result<Vec<LabelHours>> {
        validate_count(count)?;

        let mut tally = FirstSeenTally::<f64>::new();
        for record in filtered(records, year) {
            if let Some(artist) = record.artist_name.as_deref() {
                tally.add(artist, record.seconds_played);
            }
        }

        Ok(ranked_hours(tally.into_entries(), count))
    }

    /// Listening hours per month.
    ///
    /// * `YearFilter::All` – the `count` months with the most hours, most
    ///   first; equal totals stay in chronological order.
    /// * `YearFilter::Year(y)` – all twelve months of `y` in calendar order,
    ///   `0.0` for months without plays. `count` is validated but unused.
    pub fn monthly_listening(
        records: &[PlaybackRecord],
        year: YearFilter,
        count: usize,
    ) -> Result<Vec<MonthHours>> {
        validate_count(count)?;

        match year {
            YearFilter::All => {
                let mut by_month: BTreeMap<MonthBucket, f64> = BTreeMap::new();
                for record in records {
                    *by_month.entry(record.month_bucket).or_default() += record.seconds_played;
                }

                let mut months: Vec<(MonthBucket, f64)> = by_month.into_iter().collect();
                months.sort_by(|a, b| b.1.total_cmp(&a.1));
                months.truncate(count);

                Ok(months
                    .into_iter()
                    .map(|(month, seconds)| MonthHours {
                        month,
                        hours: DurationConverter::seconds_to_display_hours(seconds),
                    })
                    .collect())
            }
            YearFilter::Year(y) => {
                let mut seconds = [0.0_f64; 12];
                for record in records.iter().filter(|r| r.year == y) {
                    let slot = record.month_bucket.month as usize - 1;
                    seconds[slot] += record.seconds_played;
                }

                Ok(seconds
                    .iter()
                    .enumerate()
                    .map(|(i, s)| MonthHours {
                        month: MonthBucket::new(y, i as u32 + 1),
                        hours: DurationConverter::seconds_to_display_hours(*s),
                    })
                    .collect())
            }
        }
    }

    /// Unrounded sum of `seconds_played` for the filtered records.
    pub fn total_seconds(records: &[PlaybackRecord], year: YearFilter) -> f64 {
        filtered(records, year).map(|r| r.seconds_played).sum()
    }

    /// Total listening hours, rounded to 2 decimal places.
    pub fn total_hours_listened(records: &[PlaybackRecord], year: YearFilter) -> f64 {
        DurationConverter::seconds_to_display_hours(Self::total_seconds(records, year))
    }

    /// Hours of the day with the most plays, as `(hour, plays)`.
    ///
    /// `count` above 24 is clamped. Hours without plays are omitted; equal
    /// counts stay in ascending hour order.
    pub fn top_hours_of_day(
        records: &[PlaybackRecord],
        year: YearFilter,
        count: usize,
    ) -> Result<Vec<HourCount>> {
        validate_count(count)?;
        let count = count.min(HOURS_PER_DAY);

        let mut plays = [0_u64; HOURS_PER_DAY];
        for record in filtered(records, year) {
            if let Some(slot) = plays.get_mut(record.hour_of_day as usize) {
                *slot += 1;
            }
        }

        let mut hours: Vec<HourCount> = plays
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(hour, n)| HourCount {
                hour: hour as u32,
                plays: *n,
            })
            .collect();
        hours.sort_by(|a, b| b.plays.cmp(&a.plays));
        hours.truncate(count);
        Ok(hours)
    }

    /// Podcast shows ranked by hours listened, as `(show, hours)`.
    pub fn top_podcasts(
        podcasts: &[PodcastRecord],
        year: YearFilter,
        count: usize,
    ) -> Result<Vec<LabelHours>> {
        validate_count(count)?;

        let mut tally = FirstSeenTally::<f64>::new();
        for record in podcasts.iter().filter(|r| year.matches(r.year)) {
            if let Some(show) = record.show_name.as_deref() {
                tally.add(show, record.seconds_played);
            }
        }

        Ok(ranked_hours(tally.into_entries(), count))
    }
}

// ── Private ───────────────────────────────────────────────────────────────────

fn validate_count(count: usize) -> Result<()> {
    if count < 1 {
        return Err(StatsError::InvalidArgument(format!(
            "count must be at least 1, got {}",
            count
        )));
    }
    Ok(())
}

fn filtered(records: &[PlaybackRecord], year: YearFilter) -> impl Iterator<Item = &PlaybackRecord> {
    records.iter().filter(move |r| year.matches(r.year))
}

/// Sort `(label, seconds)` by seconds descending (stable), keep `count` and
/// convert to rounded hours.
fn ranked_hours(mut entries: Vec<(&str, f64)>, count: usize) -> Vec<LabelHours> {
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    entries.truncate(count);
    entries
        .into_iter()
        .map(|(label, seconds)| LabelHours {
            label: label.to_string(),
            hours: DurationConverter::seconds_to_display_hours(seconds),
            seconds,
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
