//! Data layer for listening statistics.
//!
//! Discovers and parses streaming-history export files, normalizes their rows
//! into typed records and answers aggregation queries over them through
//! [`analysis::ListeningAnalyzer`].

pub mod aggregator;
pub mod analysis;
pub mod normalizer;
pub mod reader;

pub use analysis::{AnalyzerConfig, ListeningAnalyzer, LoadReport};
pub use stats_core as core;
