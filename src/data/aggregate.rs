//! Stage-by-stage transition aggregation.
//!
//! [`aggregate`] makes one pass over the journeys, counting every
//! consecutive `(stage, from, to)` pair. Aggregation is commutative and
//! associative, so [`aggregate_parallel`] splits the journeys into shards,
//! aggregates each independently and merges the partial results by
//! key-wise summation.

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::journey::PatientJourney;
use super::transition::{TransitionCount, TransitionKey, TransitionTiming};

/// What to do with a journey whose length differs from the stage count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Skip the journey and report it in [`Aggregation::skipped`].
    #[default]
    Lenient,
    /// Fail the whole batch on the first malformed journey.
    Strict,
}

/// Options controlling a single aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Number of stages every journey must have. At least two.
    pub stages: usize,
    pub policy: MalformedPolicy,
}

impl AggregateOptions {
    pub fn new(stages: usize) -> Self {
        Self {
            stages,
            policy: MalformedPolicy::default(),
        }
    }

    pub fn strict(mut self) -> Self {
        self.policy = MalformedPolicy::Strict;
        self
    }
}

/// A journey that was rejected because its length did not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedRecord {
    pub patient: String,
    /// Zero-based position of the journey in the input.
    pub position: usize,
    pub expected: usize,
    pub found: usize,
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "patient {} (record {}) has {} stages, expected {}",
            self.patient, self.position, self.found, self.expected
        )
    }
}

/// Non-fatal conditions noticed during aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationWarning {
    /// No journeys were supplied, or none survived the malformed filter.
    EmptyInput,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("malformed record: {0}")]
    Malformed(MalformedRecord),

    #[error("at least 2 stages are needed to form a transition, got {0}")]
    TooFewStages(usize),
}

/// Result of aggregating a batch of journeys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub stages: usize,
    pub counts: TransitionCount,
    pub timing: TransitionTiming,
    /// Number of journeys that contributed to `counts`.
    pub accepted: usize,
    pub skipped: Vec<MalformedRecord>,
    pub warnings: Vec<AggregationWarning>,
}

impl Aggregation {
    fn empty(stages: usize) -> Self {
        Self {
            stages,
            ..Default::default()
        }
    }

    /// Result for input too short to form a single transition.
    pub fn without_transitions(stages: usize) -> Self {
        Self::empty(stages).finish()
    }

    /// Fold a partial aggregation over a disjoint set of patients into this one.
    ///
    /// Both sides must use the same stage count. An `EmptyInput` warning
    /// only survives while the merged result is still empty.
    pub fn merge(&mut self, other: Aggregation) {
        debug_assert_eq!(
            self.stages, other.stages,
            "merging aggregations of different stage counts"
        );
        self.counts.merge(other.counts);
        self.timing.merge(other.timing);
        self.accepted += other.accepted;
        self.skipped.extend(other.skipped);
        self.skipped.sort_by_key(|r| r.position);
        for warning in other.warnings {
            if !self.warnings.contains(&warning) {
                self.warnings.push(warning);
            }
        }
        if self.accepted > 0 {
            self.warnings.retain(|w| *w != AggregationWarning::EmptyInput);
        }
    }

    fn finish(mut self) -> Self {
        self.skipped.sort_by_key(|r| r.position);
        if self.accepted == 0 {
            warn!("no journeys to aggregate; transition counts are empty");
            self.warnings.push(AggregationWarning::EmptyInput);
        } else {
            info!(
                patients = self.accepted,
                skipped = self.skipped.len(),
                transitions = self.counts.len(),
                "aggregated journeys"
            );
        }
        self
    }
}

/// Aggregate journeys into transition counts in a single pass.
pub fn aggregate(
    journeys: &[PatientJourney],
    options: &AggregateOptions,
) -> Result<Aggregation, AggregateError> {
    check_stages(options.stages)?;
    let partial = aggregate_shard(journeys, 0, options)?;
    Ok(partial.finish())
}

/// Aggregate journeys across `shards` parallel partitions.
///
/// Produces the same result as [`aggregate`]. Under the strict policy the
/// reported malformed record is the one with the lowest position among
/// those found.
pub fn aggregate_parallel(
    journeys: &[PatientJourney],
    options: &AggregateOptions,
    shards: usize,
) -> Result<Aggregation, AggregateError> {
    check_stages(options.stages)?;
    if shards <= 1 || journeys.len() < 2 {
        return aggregate(journeys, options);
    }

    let chunk_size = journeys.len().div_ceil(shards);
    debug!(shards, chunk_size, "aggregating in parallel");

    let partials: Vec<Result<Aggregation, AggregateError>> = journeys
        .par_chunks(chunk_size)
        .enumerate()
        .map(|(i, chunk)| aggregate_shard(chunk, i * chunk_size, options))
        .collect();

    let mut total = Aggregation::empty(options.stages);
    let mut first_error: Option<MalformedRecord> = None;
    for partial in partials {
        match partial {
            Ok(partial) => total.merge(partial),
            Err(AggregateError::Malformed(record)) => {
                if first_error.as_ref().map_or(true, |e| record.position < e.position) {
                    first_error = Some(record);
                }
            }
            Err(other) => return Err(other),
        }
    }
    if let Some(record) = first_error {
        return Err(AggregateError::Malformed(record));
    }

    Ok(total.finish())
}

fn check_stages(stages: usize) -> Result<(), AggregateError> {
    if stages < 2 {
        return Err(AggregateError::TooFewStages(stages));
    }
    Ok(())
}

/// Aggregate one contiguous run of journeys starting at input position `offset`.
fn aggregate_shard(
    journeys: &[PatientJourney],
    offset: usize,
    options: &AggregateOptions,
) -> Result<Aggregation, AggregateError> {
    let mut result = Aggregation::empty(options.stages);

    for (i, journey) in journeys.iter().enumerate() {
        if journey.len() != options.stages {
            let record = MalformedRecord {
                patient: journey.patient.clone(),
                position: offset + i,
                expected: options.stages,
                found: journey.len(),
            };
            match options.policy {
                MalformedPolicy::Strict => return Err(AggregateError::Malformed(record)),
                MalformedPolicy::Lenient => {
                    warn!(%record, "skipping malformed journey");
                    result.skipped.push(record);
                    continue;
                }
            }
        }

        for (stage, from, to) in journey.steps() {
            let key = TransitionKey::new(stage, from.label.as_str(), to.label.as_str());
            if let (Some(start), Some(end)) = (from.observed_at, to.observed_at) {
                result.timing.record(key.clone(), (end - start).num_days());
            }
            result.counts.increment(key);
        }
        result.accepted += 1;
    }

    Ok(result)
}
