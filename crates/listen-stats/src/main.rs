mod bootstrap;
mod report;

use anyhow::{Context, Result};
use stats_core::settings::Settings;
use stats_data::reader::resolve_data_dir;
use stats_data::{AnalyzerConfig, ListeningAnalyzer};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("listen-stats v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Year: {}, Count: {}, Timezone: {}",
        settings.year,
        settings.count,
        settings.timezone
    );

    let data_dir = resolve_data_dir(settings.data_dir.as_deref());
    tracing::info!("Reading streaming history from {}", data_dir.display());

    let config = AnalyzerConfig {
        timezone: settings.timezone.clone(),
    };
    let engine = ListeningAnalyzer::from_dir(&data_dir, &config)
        .with_context(|| format!("failed to load history from {}", data_dir.display()))?;

    let load = engine.load_report();
    tracing::debug!(
        "Parsed {} audio and {} video sources in {:.3}s, normalized in {:.3}s ({})",
        load.audio_sources,
        load.video_sources,
        load.load_time_seconds,
        load.normalize_time_seconds,
        load.timezone
    );
    for skipped in &load.skipped {
        tracing::debug!(
            "Skipped {}[{}]: {}",
            skipped.source_name,
            skipped.index,
            skipped.reason
        );
    }

    let text = report::render(
        &engine,
        report::ReportOptions {
            year: settings.year,
            count: settings.count as usize,
        },
    )?;
    print!("{}", text);

    Ok(())
}
