//! In-memory journey source.

use super::{JourneySource, SourceError};
use crate::data::PatientJourney;

/// A source backed by journeys already held in memory.
///
/// Useful when journeys are built by another library, and in tests.
#[derive(Debug, Clone)]
pub struct MemorySource {
    journeys: Vec<PatientJourney>,
    stages: Option<usize>,
}

impl MemorySource {
    pub fn new(journeys: Vec<PatientJourney>) -> Self {
        Self {
            journeys,
            stages: None,
        }
    }

    /// Declare the stage count this batch was collected with.
    pub fn with_stages(mut self, stages: usize) -> Self {
        self.stages = Some(stages);
        self
    }
}

impl JourneySource for MemorySource {
    fn load(&mut self) -> Result<Vec<PatientJourney>, SourceError> {
        Ok(self.journeys.clone())
    }

    fn description(&self) -> &str {
        "memory"
    }

    fn stage_hint(&self) -> Option<usize> {
        self.stages
    }
}
