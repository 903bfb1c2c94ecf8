//! Patient journey records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single condition/treatment label recorded for a patient at one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub label: String,
    /// When the label was recorded. Wide-format inputs carry no timestamps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<NaiveDateTime>,
}

impl Observation {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            observed_at: None,
        }
    }

    pub fn at(label: impl Into<String>, observed_at: NaiveDateTime) -> Self {
        Self {
            label: label.into(),
            observed_at: Some(observed_at),
        }
    }
}

/// The ordered sequence of labels observed for one patient, one per stage.
///
/// Journeys are read once from a [`JourneySource`](crate::source::JourneySource)
/// and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientJourney {
    pub patient: String,
    pub observations: Vec<Observation>,
}

impl PatientJourney {
    pub fn new(patient: impl Into<String>, observations: Vec<Observation>) -> Self {
        Self {
            patient: patient.into(),
            observations,
        }
    }

    /// Build an untimed journey from plain labels.
    pub fn from_labels<I, S>(patient: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(patient, labels.into_iter().map(Observation::new).collect())
    }

    /// Number of stages observed.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.observations.iter().map(|o| o.label.as_str())
    }

    /// Consecutive observation pairs, tagged with the index of the earlier stage.
    pub fn steps(&self) -> impl Iterator<Item = (usize, &Observation, &Observation)> {
        self.observations
            .windows(2)
            .enumerate()
            .map(|(stage, pair)| (stage, &pair[0], &pair[1]))
    }
}
