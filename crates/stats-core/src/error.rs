use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the listening-statistics engine.
#[derive(Error, Debug)]
pub enum StatsError {
    /// No `Streaming_History_Audio*` source was supplied or discovered.
    #[error("No audio streaming history found: {0}")]
    SourceNotFound(String),

    /// A source could not be parsed as a JSON array of flat objects.
    #[error("Malformed input in {source_name}: {reason}")]
    MalformedInput { source_name: String, reason: String },

    /// A timestamp string did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// A year filter that is neither `"All"` nor an integer year.
    #[error("Invalid year filter: {0}")]
    InvalidFilter(String),

    /// A caller-supplied query parameter outside its documented domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A source file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the stats crates.
pub type Result<T> = std::result::Result<T, StatsError>;
