//! Plain-text rendering of a [`ListeningAnalyzer`] for the terminal.

use std::fmt::Write as _;

use anyhow::Result;
use chrono::{DateTime, Utc};
use stats_core::formatting::{format_hours, format_listening_time, format_number, percentage};
use stats_core::models::{FieldSelector, YearFilter};
use stats_data::ListeningAnalyzer;

/// Options that shape the rendered report.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub year: YearFilter,
    pub count: usize,
}

/// Render every dashboard section into one string.
pub fn render(engine: &ListeningAnalyzer, opts: ReportOptions) -> Result<String> {
    let mut out = String::new();
    let summary = engine.summary();
    let total_hours = engine.total_hours_listened(opts.year);
    let total_seconds = engine.total_seconds(opts.year);

    writeln!(out, "Listening statistics ({})", opts.year)?;
    writeln!(out)?;
    writeln!(
        out,
        "Total listening time: {}",
        format_listening_time(&engine.listening_time(opts.year))
    )?;
    writeln!(
        out,
        "Total hours:          {}",
        format_hours(total_hours)
    )?;
    writeln!(
        out,
        "Plays:                {}",
        format_number(summary.total_plays as f64, 0)
    )?;
    writeln!(
        out,
        "Artists / tracks:     {} / {}",
        format_number(summary.distinct_artists as f64, 0),
        format_number(summary.distinct_tracks as f64, 0)
    )?;
    if let (Some(first), Some(last)) = (summary.first_played, summary.last_played) {
        writeln!(out, "History:              {} to {}", day(first), day(last))?;
    }

    for selector in FieldSelector::ALL {
        let rows = engine.top_by_single_field(opts.count, opts.year, selector)?;
        section(&mut out, &format!("Top {}", selector))?;
        for (rank, row) in rows.iter().enumerate() {
            writeln!(out, "{:>3}. {} ({} plays)", rank + 1, row.label, row.plays)?;
        }
    }

    section(&mut out, "Top artists by listening time")?;
    for (rank, row) in engine
        .top_artists_by_playtime(opts.count, opts.year)?
        .iter()
        .enumerate()
    {
        writeln!(
            out,
            "{:>3}. {} ({}, {}%)",
            rank + 1,
            row.label,
            format_hours(row.hours),
            percentage(row.seconds, total_seconds, 1)
        )?;
    }

    section(&mut out, "Listening by month")?;
    for row in engine.monthly_listening(opts.year, opts.count)? {
        writeln!(out, "  {}  {}", row.label(), format_hours(row.hours))?;
    }

    section(&mut out, "Most active hours")?;
    for row in engine.top_hours_of_day(opts.year, opts.count)? {
        writeln!(out, "  {:02}:00  {} plays", row.hour, row.plays)?;
    }

    let podcasts = engine.top_podcasts(opts.year, opts.count)?;
    if !podcasts.is_empty() {
        section(&mut out, "Top podcasts")?;
        for (rank, row) in podcasts.iter().enumerate() {
            writeln!(out, "{:>3}. {} ({})", rank + 1, row.label, format_hours(row.hours))?;
        }
    }

    if summary.skipped_rows > 0 {
        writeln!(out)?;
        writeln!(
            out,
            "Skipped {} unreadable rows (run with --debug for details)",
            summary.skipped_rows
        )?;
    }

    Ok(out)
}

fn section(out: &mut String, title: &str) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "-".repeat(title.len()))
}

fn day(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stats_data::reader::NamedSource;
    use stats_data::AnalyzerConfig;

    fn engine() -> ListeningAnalyzer {
        let rows = r#"[
            {"ts": "2024-01-01T10:00:00Z", "ms_played": 180000,
             "master_metadata_album_artist_name": "A",
             "master_metadata_track_name": "T1",
             "master_metadata_album_album_name": "Album"},
            {"ts": "2024-06-01T10:00:00Z", "ms_played": 120000,
             "master_metadata_album_artist_name": "A",
             "master_metadata_track_name": "T2",
             "master_metadata_album_album_name": "Album"},
            {"ms_played": 1000}
        ]"#;
        ListeningAnalyzer::from_sources(
            vec![NamedSource::from_bytes("Streaming_History_Audio_2024.json", rows)],
            &AnalyzerConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_render_contains_every_section() {
        let text = render(
            &engine(),
            ReportOptions {
                year: YearFilter::All,
                count: 5,
            },
        )
        .unwrap();

        assert!(text.starts_with("Listening statistics (All)"));
        assert!(text.contains("Top Artists"));
        assert!(text.contains("Top Songs"));
        assert!(text.contains("Top Albums"));
        assert!(text.contains("  1. A (2 plays)"));
        assert!(text.contains("  1. T1 - A (1 plays)"));
        assert!(text.contains("Listening by month"));
        assert!(text.contains("  10:00  2 plays"));
        assert!(text.contains("History:              2024-01-01 to 2024-06-01"));
        assert!(text.contains("Skipped 1 unreadable rows"));
        assert!(!text.contains("Top podcasts"));
    }

    #[test]
    fn test_render_podcasts_and_playtime_shares() {
        let audio = r#"[
            {"ts": "2024-03-01T08:00:00Z", "ms_played": 20000,
             "master_metadata_album_artist_name": "Long", "master_metadata_track_name": "a"},
            {"ts": "2024-03-01T09:00:00Z", "ms_played": 10000,
             "master_metadata_album_artist_name": "Short", "master_metadata_track_name": "b"}
        ]"#;
        let video = r#"[
            {"ts": "2024-03-02T07:00:00Z", "ms_played": 5400000,
             "episode_show_name": "Morning Show", "episode_name": "Ep 1"}
        ]"#;
        let engine = ListeningAnalyzer::from_sources(
            vec![
                NamedSource::from_bytes("Streaming_History_Audio_2024.json", audio),
                NamedSource::from_bytes("Streaming_History_Video_2024.json", video),
            ],
            &AnalyzerConfig::default(),
        )
        .unwrap();

        let text = render(
            &engine,
            ReportOptions {
                year: YearFilter::All,
                count: 5,
            },
        )
        .unwrap();

        assert!(text.contains("Top podcasts"));
        assert!(text.contains("  1. Morning Show (1.50 h)"));
        // 20 s and 10 s of a 30 s total; both round to about 0.01 h.
        assert!(text.contains("  1. Long (0.01 h, 66.7%)"));
        assert!(text.contains("  2. Short (0.00 h, 33.3%)"));
    }

    #[test]
    fn test_render_single_year_lists_every_month() {
        let text = render(
            &engine(),
            ReportOptions {
                year: YearFilter::Year(2024),
                count: 3,
            },
        )
        .unwrap();

        assert!(text.starts_with("Listening statistics (2024)"));
        for month in 1..=12 {
            assert!(text.contains(&format!("  2024-{:02}  ", month)));
        }
    }
}
