//! Event-log file source.
//!
//! Reads a long-format file with one row per observation (for example a
//! conditions extract with `PATIENT`, `START` and `DESCRIPTION` columns)
//! and assembles one journey per patient, ordered by observation time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{JourneySource, SourceError};
use crate::data::{Observation, PatientJourney};

/// Column names of an event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventColumns {
    pub patient: String,
    pub label: String,
    pub date: String,
}

impl Default for EventColumns {
    fn default() -> Self {
        Self {
            patient: "PATIENT".to_string(),
            label: "DESCRIPTION".to_string(),
            date: "START".to_string(),
        }
    }
}

/// Parse an observation timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]`, `YYYY-MM-DD HH:MM:SS[.fff]`
/// and bare `YYYY-MM-DD` dates (taken as midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// A source grouping event rows into per-patient journeys.
///
/// Patients appear in the order of their first row. Each patient's
/// observations are sorted by timestamp; rows with equal timestamps keep
/// their file order.
#[derive(Debug)]
pub struct EventLogSource {
    path: PathBuf,
    description: String,
    columns: EventColumns,
    delimiter: u8,
}

impl EventLogSource {
    pub fn new<P: AsRef<Path>>(path: P, columns: EventColumns) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("event log: {}", path.display());
        Self {
            path,
            description,
            columns,
            delimiter: b',',
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

fn required_field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    row: u64,
    column: &str,
) -> Result<&'r str, SourceError> {
    match record.get(index) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(SourceError::MissingField {
            row,
            column: column.to_string(),
        }),
    }
}

impl JourneySource for EventLogSource {
    fn load(&mut self) -> Result<Vec<PatientJourney>, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.csv_error(e))?;

        let headers = reader.headers().map_err(|e| self.csv_error(e))?.clone();
        let patient_index = self.column_index(&headers, &self.columns.patient)?;
        let label_index = self.column_index(&headers, &self.columns.label)?;
        let date_index = self.column_index(&headers, &self.columns.date)?;

        let mut order: HashMap<String, usize> = HashMap::new();
        let mut grouped: Vec<(String, Vec<Observation>)> = Vec::new();
        let mut rows = 0usize;

        for record in reader.records() {
            let record = record.map_err(|e| self.csv_error(e))?;
            // Line numbers count the header, so data starts at line 2.
            let row = record.position().map_or(0, |p| p.line());

            let patient = required_field(&record, patient_index, row, &self.columns.patient)?;
            let label = required_field(&record, label_index, row, &self.columns.label)?;
            let date = required_field(&record, date_index, row, &self.columns.date)?;
            let observed_at = parse_timestamp(date).ok_or_else(|| SourceError::InvalidTimestamp {
                row,
                value: date.to_string(),
            })?;

            let slot = *order.entry(patient.to_string()).or_insert_with(|| {
                grouped.push((patient.to_string(), Vec::new()));
                grouped.len() - 1
            });
            grouped[slot].1.push(Observation::at(label, observed_at));
            rows += 1;
        }

        let journeys: Vec<PatientJourney> = grouped
            .into_iter()
            .map(|(patient, mut observations)| {
                observations.sort_by_key(|o| o.observed_at);
                PatientJourney::new(patient, observations)
            })
            .collect();

        debug!(
            path = %self.path.display(),
            rows,
            patients = journeys.len(),
            "loaded event log"
        );
        Ok(journeys)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    fn conditions_csv() -> &'static str {
        "START,STOP,PATIENT,CODE,DESCRIPTION\n\
         2019-01-01,,p1,44054006,Diabetes\n\
         2019-03-01,,p2,38341003,Hypertension\n\
         2019-02-15,,p1,38341003,Hypertension\n\
         2019-01-20,,p2,44054006,Diabetes\n\
         2019-06-01,,p1,271737000,Anemia\n"
    }

    #[test]
    fn groups_rows_by_patient_in_first_seen_order() {
        let file = write_file(conditions_csv());
        let mut source = EventLogSource::new(file.path(), EventColumns::default());

        let journeys = source.load().unwrap();
        assert_eq!(journeys.len(), 2);
        assert_eq!(journeys[0].patient, "p1");
        assert_eq!(journeys[1].patient, "p2");
        assert_eq!(
            journeys[0].labels().collect::<Vec<_>>(),
            vec!["Diabetes", "Hypertension", "Anemia"]
        );
        assert!(source.stage_hint().is_none());
    }

    #[test]
    fn observations_sorted_by_timestamp() {
        let file = write_file(conditions_csv());
        let mut source = EventLogSource::new(file.path(), EventColumns::default());

        let journeys = source.load().unwrap();
        // p2's Diabetes row comes later in the file but is earlier in time.
        assert_eq!(
            journeys[1].labels().collect::<Vec<_>>(),
            vec!["Diabetes", "Hypertension"]
        );
        let first = journeys[1].observations[0].observed_at.unwrap();
        assert_eq!(first.date(), NaiveDate::from_ymd_opt(2019, 1, 20).unwrap());
    }

    #[test]
    fn custom_column_names() {
        let file = write_file("who\twhat\twhen\nx\tFlu\t2021-05-01T10:00:00\n");
        let columns = EventColumns {
            patient: "who".to_string(),
            label: "what".to_string(),
            date: "when".to_string(),
        };
        let mut source = EventLogSource::new(file.path(), columns).with_delimiter(b'\t');

        let journeys = source.load().unwrap();
        assert_eq!(journeys[0].patient, "x");
        assert_eq!(journeys[0].observations[0].label, "Flu");
    }

    #[test]
    fn bad_timestamp_names_the_row() {
        let file = write_file("START,PATIENT,DESCRIPTION\n2019-01-01,p1,A\nlast tuesday,p1,B\n");
        let mut source = EventLogSource::new(file.path(), EventColumns::default());

        let err = source.load().unwrap_err();
        match err {
            SourceError::InvalidTimestamp { row, value } => {
                assert_eq!(row, 3);
                assert_eq!(value, "last tuesday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_label_is_rejected() {
        let file = write_file("START,PATIENT,DESCRIPTION\n2019-01-01,p1,\n");
        let mut source = EventLogSource::new(file.path(), EventColumns::default());

        let err = source.load().unwrap_err();
        assert!(matches!(err, SourceError::MissingField { ref column, .. } if column == "DESCRIPTION"));
    }

    #[test]
    fn missing_date_column_is_reported() {
        let file = write_file("PATIENT,DESCRIPTION\np1,A\n");
        let mut source = EventLogSource::new(file.path(), EventColumns::default());

        let err = source.load().unwrap_err();
        assert!(matches!(err, SourceError::MissingColumn { ref column, .. } if column == "START"));
    }

    #[test]
    fn timestamp_formats() {
        let midnight = NaiveDate::from_ymd_opt(2020, 2, 29)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2020-02-29"), Some(midnight));
        assert_eq!(parse_timestamp("2020-02-29T00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2020-02-29 00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2020-02-29T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2020-02-29T01:00:00+01:00"), Some(midnight));
        assert!(parse_timestamp("2020-02-30").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
