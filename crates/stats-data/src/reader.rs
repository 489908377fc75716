//! Streaming-history source discovery and loading.
//!
//! Partitions named sources into the audio and video/podcast streams by file
//! name prefix, parses each as a JSON array of objects and concatenates the
//! rows per stream in source order.

use std::io::Read;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::{Map, Value};
use stats_core::error::{Result, StatsError};
use tracing::{debug, warn};

/// File name prefix of music listening-history sources.
pub const AUDIO_PREFIX: &str = "Streaming_History_Audio";
/// File name prefix of video / podcast listening-history sources.
pub const VIDEO_PREFIX: &str = "Streaming_History_Video";

// ── Sources ───────────────────────────────────────────────────────────────────

/// Which pipeline a source feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Audio,
    Video,
}

impl SourceKind {
    /// Classify a source by the file-name component of `name`.
    pub fn from_name(name: &str) -> Option<Self> {
        let file_name = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);
        if file_name.starts_with(AUDIO_PREFIX) {
            Some(SourceKind::Audio)
        } else if file_name.starts_with(VIDEO_PREFIX) {
            Some(SourceKind::Video)
        } else {
            None
        }
    }
}

/// An in-memory byte source with the name it was uploaded or stored under.
#[derive(Debug, Clone)]
pub struct NamedSource {
    pub name: String,
    pub data: Vec<u8>,
}

impl NamedSource {
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Drain `reader` into memory.
    pub fn from_reader(name: impl Into<String>, mut reader: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::from_bytes(name, data))
    }

    /// Read a file from disk; the source name is the file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| StatsError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(name, data))
    }

    pub fn kind(&self) -> Option<SourceKind> {
        SourceKind::from_name(&self.name)
    }
}

// ── Parsed output ─────────────────────────────────────────────────────────────

/// The parsed rows of one source, in file order.
#[derive(Debug, Clone)]
pub struct RawSource {
    pub name: String,
    pub rows: Vec<Map<String, Value>>,
}

/// All parsed rows, per stream, in source order.
#[derive(Debug, Clone, Default)]
pub struct RawHistory {
    pub audio: Vec<RawSource>,
    pub video: Vec<RawSource>,
}

impl RawHistory {
    pub fn audio_row_count(&self) -> usize {
        self.audio.iter().map(|s| s.rows.len()).sum()
    }

    pub fn video_row_count(&self) -> usize {
        self.video.iter().map(|s| s.rows.len()).sum()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find streaming-history `.json` files recursively under `dir`, sorted by
/// path. Files whose name matches neither prefix are left out.
pub fn discover_sources(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Data path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
                && entry
                    .file_name()
                    .to_str()
                    .and_then(SourceKind::from_name)
                    .is_some()
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Scan `dir` and load every streaming-history file found in it.
pub fn load_dir(dir: &Path) -> Result<RawHistory> {
    let paths = discover_sources(dir);
    if paths.is_empty() {
        return Err(StatsError::SourceNotFound(format!(
            "no {}*.json files under {}",
            AUDIO_PREFIX,
            dir.display()
        )));
    }

    let sources = paths
        .iter()
        .map(|p| NamedSource::from_path(p))
        .collect::<Result<Vec<_>>>()?;
    load_sources(sources)
}

/// Partition `sources` by name, parse them and concatenate rows per stream.
///
/// Fails with [`StatsError::SourceNotFound`] when no audio source is present
/// and with [`StatsError::MalformedInput`] when any source is not a JSON
/// array of objects; nothing is returned in that case.
pub fn load_sources(sources: Vec<NamedSource>) -> Result<RawHistory> {
    let mut audio: Vec<NamedSource> = Vec::new();
    let mut video: Vec<NamedSource> = Vec::new();

    for source in sources {
        match source.kind() {
            Some(SourceKind::Audio) => audio.push(source),
            Some(SourceKind::Video) => video.push(source),
            None => debug!("Ignoring source {}: not a streaming-history file", source.name),
        }
    }

    if audio.is_empty() {
        return Err(StatsError::SourceNotFound(format!(
            "no source named {}*",
            AUDIO_PREFIX
        )));
    }

    // Parse independently, then join before concatenation. `collect` keeps
    // input order and short-circuits on a failing source.
    let audio = audio.par_iter().map(parse_source).collect::<Result<Vec<_>>>()?;
    let video = video.par_iter().map(parse_source).collect::<Result<Vec<_>>>()?;

    let history = RawHistory { audio, video };
    debug!(
        "Loaded {} audio rows from {} sources, {} video rows from {} sources",
        history.audio_row_count(),
        history.audio.len(),
        history.video_row_count(),
        history.video.len(),
    );
    Ok(history)
}

/// Default folders searched when no data directory is configured.
pub fn default_data_dir_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("data")];
    if let Some(downloads) = dirs::download_dir() {
        candidates.push(downloads.join("Spotify Extended Streaming History"));
        candidates.push(downloads.join("my_spotify_data"));
    }
    candidates
}

/// Use `data_dir` when given, otherwise the first existing default candidate,
/// otherwise `./data`.
pub fn resolve_data_dir(data_dir: Option<&Path>) -> PathBuf {
    if let Some(p) = data_dir {
        return p.to_path_buf();
    }
    default_data_dir_candidates()
        .into_iter()
        .find(|p| p.is_dir())
        .unwrap_or_else(|| PathBuf::from("data"))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn parse_source(source: &NamedSource) -> Result<RawSource> {
    let malformed = |reason: String| StatsError::MalformedInput {
        source_name: source.name.clone(),
        reason,
    };

    let value: Value =
        serde_json::from_slice(&source.data).map_err(|e| malformed(e.to_string()))?;

    let Value::Array(items) = value else {
        return Err(malformed("expected a JSON array of objects".to_string()));
    };

    let rows = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(malformed(format!("element {} is not an object", index))),
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Source {}: {} rows", source.name, rows.len());
    Ok(RawSource {
        name: source.name.clone(),
        rows,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn audio_json(tracks: &[&str]) -> String {
        let rows: Vec<Value> = tracks
            .iter()
            .map(|t| {
                serde_json::json!({
                    "ts": "2024-01-01T10:00:00Z",
                    "ms_played": 1000,
                    "master_metadata_track_name": t,
                })
            })
            .collect();
        Value::Array(rows).to_string()
    }

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    // ── SourceKind ────────────────────────────────────────────────────────────

    #[test]
    fn test_source_kind_from_name() {
        assert_eq!(
            SourceKind::from_name("Streaming_History_Audio_2023-2024_0.json"),
            Some(SourceKind::Audio)
        );
        assert_eq!(
            SourceKind::from_name("Streaming_History_Video_2020-2024.json"),
            Some(SourceKind::Video)
        );
        assert_eq!(SourceKind::from_name("ReadMeFirst.pdf"), None);
    }

    #[test]
    fn test_source_kind_uses_file_name_component() {
        assert_eq!(
            SourceKind::from_name("/exports/Streaming_History_Audio_2024_1.json"),
            Some(SourceKind::Audio)
        );
    }

    // ── load_sources ──────────────────────────────────────────────────────────

    #[test]
    fn test_load_sources_concatenates_in_source_order() {
        let sources = vec![
            NamedSource::from_bytes("Streaming_History_Audio_1.json", audio_json(&["a", "b"])),
            NamedSource::from_bytes("Streaming_History_Audio_0.json", audio_json(&["c"])),
        ];
        let history = load_sources(sources).unwrap();

        assert_eq!(history.audio.len(), 2);
        assert_eq!(history.audio[0].name, "Streaming_History_Audio_1.json");
        assert_eq!(history.audio_row_count(), 3);
        let tracks: Vec<&str> = history
            .audio
            .iter()
            .flat_map(|s| s.rows.iter())
            .map(|r| r["master_metadata_track_name"].as_str().unwrap())
            .collect();
        assert_eq!(tracks, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_load_sources_partitions_video() {
        let sources = vec![
            NamedSource::from_bytes("Streaming_History_Audio_0.json", audio_json(&["a"])),
            NamedSource::from_bytes("Streaming_History_Video_0.json", "[]"),
            NamedSource::from_bytes("Userdata.json", "{\"user\": 1}"),
        ];
        let history = load_sources(sources).unwrap();
        assert_eq!(history.audio.len(), 1);
        assert_eq!(history.video.len(), 1);
        assert_eq!(history.video_row_count(), 0);
    }

    #[test]
    fn test_load_sources_without_video_is_ok() {
        let sources = vec![NamedSource::from_bytes(
            "Streaming_History_Audio_0.json",
            audio_json(&["a"]),
        )];
        let history = load_sources(sources).unwrap();
        assert!(history.video.is_empty());
    }

    #[test]
    fn test_load_sources_requires_audio() {
        let sources = vec![NamedSource::from_bytes("Streaming_History_Video_0.json", "[]")];
        let err = load_sources(sources).unwrap_err();
        assert!(matches!(err, StatsError::SourceNotFound(_)));
    }

    #[test]
    fn test_load_sources_empty_input() {
        assert!(matches!(
            load_sources(Vec::new()),
            Err(StatsError::SourceNotFound(_))
        ));
    }

    #[test]
    fn test_load_sources_invalid_json_fails_whole_load() {
        let sources = vec![
            NamedSource::from_bytes("Streaming_History_Audio_0.json", audio_json(&["a"])),
            NamedSource::from_bytes("Streaming_History_Audio_1.json", "[{\"ts\": "),
        ];
        let err = load_sources(sources).unwrap_err();
        match err {
            StatsError::MalformedInput { source_name, .. } => {
                assert_eq!(source_name, "Streaming_History_Audio_1.json");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_sources_rejects_non_array() {
        let sources = vec![NamedSource::from_bytes(
            "Streaming_History_Audio_0.json",
            "{\"ts\": \"2024-01-01T10:00:00Z\"}",
        )];
        assert!(matches!(
            load_sources(sources),
            Err(StatsError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_load_sources_rejects_non_object_element() {
        let sources = vec![NamedSource::from_bytes(
            "Streaming_History_Audio_0.json",
            "[{\"ts\": \"2024-01-01T10:00:00Z\"}, 42]",
        )];
        let err = load_sources(sources).unwrap_err();
        assert!(err.to_string().contains("element 1 is not an object"));
    }

    #[test]
    fn test_load_sources_malformed_video_also_fails() {
        let sources = vec![
            NamedSource::from_bytes("Streaming_History_Audio_0.json", audio_json(&["a"])),
            NamedSource::from_bytes("Streaming_History_Video_0.json", "not json"),
        ];
        let err = load_sources(sources).unwrap_err();
        assert!(err.to_string().contains("Streaming_History_Video_0.json"));
    }

    // ── NamedSource ───────────────────────────────────────────────────────────

    #[test]
    fn test_named_source_from_reader() {
        let source =
            NamedSource::from_reader("Streaming_History_Audio_0.json", "[]".as_bytes()).unwrap();
        assert_eq!(source.data, b"[]");
        assert_eq!(source.kind(), Some(SourceKind::Audio));
    }

    #[test]
    fn test_named_source_from_missing_path() {
        let err = NamedSource::from_path(Path::new("/tmp/no-such-dir-xyz/a.json")).unwrap_err();
        assert!(matches!(err, StatsError::FileRead { .. }));
    }

    // ── discover_sources / load_dir ───────────────────────────────────────────

    #[test]
    fn test_discover_sources_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("Spotify Extended Streaming History");
        std::fs::create_dir_all(&nested).unwrap();
        write_file(&nested, "Streaming_History_Audio_2024_1.json", "[]");
        write_file(&nested, "Streaming_History_Audio_2023_0.json", "[]");
        write_file(&nested, "Streaming_History_Video_2020-2024.json", "[]");
        write_file(&nested, "ReadMeFirst_ExtendedStreamingHistory.pdf", "pdf");
        write_file(dir.path(), "Playlist1.json", "[]");

        let files = discover_sources(dir.path());
        let names: Vec<&str> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "Streaming_History_Audio_2023_0.json",
                "Streaming_History_Audio_2024_1.json",
                "Streaming_History_Video_2020-2024.json",
            ]
        );
    }

    #[test]
    fn test_discover_sources_nonexistent_path() {
        let files = discover_sources(Path::new("/tmp/does-not-exist-listen-stats-xyz"));
        assert!(files.is_empty());
    }

    #[test]
    fn test_load_dir_reads_files() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "Streaming_History_Audio_0.json", &audio_json(&["a", "b"]));
        let history = load_dir(dir.path()).unwrap();
        assert_eq!(history.audio_row_count(), 2);
    }

    #[test]
    fn test_load_dir_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_dir(dir.path()),
            Err(StatsError::SourceNotFound(_))
        ));
    }

    // ── resolve_data_dir ──────────────────────────────────────────────────────

    #[test]
    fn test_resolve_data_dir_explicit_wins() {
        let dir = resolve_data_dir(Some(Path::new("/exports/history")));
        assert_eq!(dir, PathBuf::from("/exports/history"));
    }
}
