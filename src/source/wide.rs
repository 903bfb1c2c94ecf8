//! Wide-format file source.
//!
//! Reads a delimited file where each row is one patient and each stage
//! column holds the label observed at that stage.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{JourneySource, SourceError};
use crate::data::{Observation, PatientJourney};

/// Which columns of a wide file carry the patient id and the stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WideLayout {
    /// Column holding the patient identifier. Rows are numbered from 1
    /// when unset.
    pub id_column: Option<String>,
    /// Stage columns in stage order. Every non-id column, in header
    /// order, when empty.
    pub stage_columns: Vec<String>,
}

/// A source reading one journey per row of a delimited file.
///
/// A journey ends at its first empty stage cell, so a patient lost to
/// follow-up yields a journey shorter than the stage count.
#[derive(Debug)]
pub struct WideCsvSource {
    path: PathBuf,
    description: String,
    layout: WideLayout,
    delimiter: u8,
    stage_count: Option<usize>,
}

impl WideCsvSource {
    pub fn new<P: AsRef<Path>>(path: P, layout: WideLayout) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("wide file: {}", path.display());
        Self {
            path,
            description,
            layout,
            delimiter: b',',
            stage_count: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn csv_error(&self, source: csv::Error) -> SourceError {
        SourceError::Csv {
            path: self.path.clone(),
            source,
        }
    }

    fn column_index(&self, headers: &csv::StringRecord, column: &str) -> Result<usize, SourceError> {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| SourceError::MissingColumn {
                path: self.path.clone(),
                column: column.to_string(),
            })
    }
}

impl JourneySource for WideCsvSource {
    fn load(&mut self) -> Result<Vec<PatientJourney>, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.csv_error(e))?;

        let headers = reader.headers().map_err(|e| self.csv_error(e))?.clone();

        let id_index = match &self.layout.id_column {
            Some(column) => Some(self.column_index(&headers, column)?),
            None => None,
        };

        let stage_indices: Vec<usize> = if self.layout.stage_columns.is_empty() {
            (0..headers.len()).filter(|i| Some(*i) != id_index).collect()
        } else {
            self.layout
                .stage_columns
                .iter()
                .map(|column| self.column_index(&headers, column))
                .collect::<Result<_, _>>()?
        };

        let mut journeys = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| self.csv_error(e))?;

            let patient = match id_index {
                Some(i) => record.get(i).unwrap_or_default().to_string(),
                None => (row + 1).to_string(),
            };

            let observations = stage_indices
                .iter()
                .map(|&i| record.get(i).unwrap_or_default())
                .take_while(|cell| !cell.is_empty())
                .map(Observation::new)
                .collect();

            journeys.push(PatientJourney::new(patient, observations));
        }

        debug!(
            path = %self.path.display(),
            journeys = journeys.len(),
            stages = stage_indices.len(),
            "loaded wide file"
        );
        self.stage_count = Some(stage_indices.len());
        Ok(journeys)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn stage_hint(&self) -> Option<usize> {
        self.stage_count
    }
}
