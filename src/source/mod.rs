//! Journey source abstraction for loading patient records.
//!
//! This module provides a trait-based abstraction over the tabular inputs
//! journeys can be read from: wide files with one row per patient, event
//! logs with one row per observation, or journeys already held in memory.

mod events;
mod memory;
mod wide;

pub use events::{parse_timestamp, EventLogSource, EventColumns};
pub use memory::MemorySource;
pub use wide::{WideCsvSource, WideLayout};

use std::fmt::Debug;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::PatientJourney;

/// Layout of a delimited input file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// One row per patient, one column per stage.
    #[default]
    Wide,
    /// One row per observation: patient, label and timestamp columns.
    Events,
}

/// Errors raised while reading journeys.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("column {column:?} not found in {}", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("row {row}: empty {column:?} field")]
    MissingField { row: u64, column: String },

    #[error("row {row}: cannot parse timestamp {value:?}")]
    InvalidTimestamp { row: u64, value: String },
}

/// Trait for loading patient journeys from various inputs.
///
/// # Example
///
/// ```
/// use journey_sankey::{JourneySource, MemorySource, PatientJourney};
///
/// let mut source = MemorySource::new(vec![
///     PatientJourney::from_labels("P1", ["Diabetes", "Hypertension"]),
/// ]);
/// let journeys = source.load().unwrap();
/// assert_eq!(journeys.len(), 1);
/// ```
pub trait JourneySource: Debug {
    /// Read every journey from the source.
    fn load(&mut self) -> Result<Vec<PatientJourney>, SourceError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;

    /// Stage count implied by the input layout, if it fixes one.
    ///
    /// Only meaningful after [`load`](Self::load) has succeeded.
    fn stage_hint(&self) -> Option<usize> {
        None
    }
}

/// Resolve the stage count for a batch.
///
/// An explicit count wins, then the source's layout, then the longest
/// journey loaded.
pub fn resolve_stages(
    explicit: Option<usize>,
    source: &dyn JourneySource,
    journeys: &[PatientJourney],
) -> usize {
    explicit
        .or_else(|| source.stage_hint())
        .unwrap_or_else(|| journeys.iter().map(PatientJourney::len).max().unwrap_or(0))
}
