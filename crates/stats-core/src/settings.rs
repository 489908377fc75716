use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::YearFilter;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Listening statistics from a streaming-history export
#[derive(Parser, Debug, Clone)]
#[command(
    name = "listen-stats",
    about = "Listening statistics from a streaming-history export",
    version
)]
pub struct Settings {
    /// Folder containing Streaming_History_Audio*.json / Streaming_History_Video*.json
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Year to report on ("All" or e.g. 2024)
    #[arg(long, default_value = "All")]
    pub year: YearFilter,

    /// How many top entries to show (1-50)
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=50))]
    pub count: u32,

    /// IANA timezone for month / hour buckets ("auto" uses the system zone)
    #[arg(long, default_value = "UTC")]
    pub timezone: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.listen-stats/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".listen-stats").join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load persisted params from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Accepts args and an explicit config path so that tests can redirect to
    /// a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. The year filter is never persisted.
        if !is_arg_explicitly_set(&matches, "data_dir") && settings.data_dir.is_none() {
            settings.data_dir = last.data_dir;
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "count") {
            if let Some(v) = last.count.filter(|c| (1..=50).contains(c)) {
                settings.count = v;
            }
        }

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        Self::resolve_auto_values(settings)
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone.eq_ignore_ascii_case("auto") {
            settings.timezone = crate::time_utils::get_system_timezone();
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data_dir: s.data_dir.clone(),
            timezone: Some(s.timezone.clone()),
            count: Some(s.count),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    // ── LastUsedParams ────────────────────────────────────────────────────────

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            data_dir: Some(PathBuf::from("/exports/my_spotify_data")),
            timezone: Some("Europe/Prague".to_string()),
            count: Some(15),
        };
        params.save_to(&path).expect("save");

        let loaded = LastUsedParams::load_from(&path);
        assert_eq!(loaded.data_dir, Some(PathBuf::from("/exports/my_spotify_data")));
        assert_eq!(loaded.timezone, Some("Europe/Prague".to_string()));
        assert_eq!(loaded.count, Some(15));
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        LastUsedParams {
            count: Some(5),
            ..Default::default()
        }
        .save_to(&path)
        .expect("save");
        assert!(path.exists());

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_last_used_params_default_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let loaded = LastUsedParams::load_from(&tmp_config_path(&tmp));
        assert!(loaded.data_dir.is_none());
        assert!(loaded.timezone.is_none());
        assert!(loaded.count.is_none());
    }

    #[test]
    fn test_last_used_params_default_when_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert!(LastUsedParams::load_from(&path).count.is_none());
    }

    // ── Settings parsing ──────────────────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["listen-stats"]);
        assert!(settings.data_dir.is_none());
        assert_eq!(settings.year, YearFilter::All);
        assert_eq!(settings.count, 10);
        assert_eq!(settings.timezone, "UTC");
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
        assert!(!settings.clear);
    }

    #[test]
    fn test_settings_cli_year() {
        let settings = Settings::parse_from(["listen-stats", "--year", "2023"]);
        assert_eq!(settings.year, YearFilter::Year(2023));
    }

    #[test]
    fn test_settings_cli_rejects_bad_year() {
        let result = Settings::try_parse_from(["listen-stats", "--year", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_cli_rejects_zero_count() {
        let result = Settings::try_parse_from(["listen-stats", "--count", "0"]);
        assert!(result.is_err());
    }

    // ── load_with_last_used_impl ──────────────────────────────────────────────

    #[test]
    fn test_load_with_last_used_merges_persisted_values() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            data_dir: Some(PathBuf::from("/exports")),
            timezone: Some("Europe/Berlin".to_string()),
            count: Some(20),
        }
        .save_to(&config_path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(vec!["listen-stats".into()], &config_path);
        assert_eq!(settings.data_dir, Some(PathBuf::from("/exports")));
        assert_eq!(settings.timezone, "Europe/Berlin");
        assert_eq!(settings.count, 20);
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            count: Some(20),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec!["listen-stats".into(), "--count".into(), "7".into()],
            &config_path,
        );
        assert_eq!(settings.count, 7);
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            count: Some(12),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        Settings::load_with_last_used_impl(
            vec!["listen-stats".into(), "--clear".into()],
            &config_path,
        );
        assert!(!config_path.exists());
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let settings = Settings::load_with_last_used_impl(
            vec!["listen-stats".into(), "--debug".into()],
            &tmp_config_path(&tmp),
        );
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_persists_after_run() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        Settings::load_with_last_used_impl(
            vec!["listen-stats".into(), "--timezone".into(), "Asia/Tokyo".into()],
            &config_path,
        );

        let loaded = LastUsedParams::load_from(&config_path);
        assert_eq!(loaded.timezone, Some("Asia/Tokyo".to_string()));
        assert_eq!(loaded.count, Some(10));
    }
}
