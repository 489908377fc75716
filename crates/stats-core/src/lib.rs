//! Core types for listening statistics.
//!
//! Domain records, query parameters and result rows, the error taxonomy,
//! timestamp / timezone handling, unit conversion, formatting and CLI settings.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{Result, StatsError};
