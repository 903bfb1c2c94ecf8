//! Journey data models and transition aggregation.
//!
//! ## Submodules
//!
//! - [`journey`]: [`PatientJourney`] and its per-stage [`Observation`]s
//! - [`transition`]: [`TransitionKey`], [`TransitionCount`] and [`TransitionTiming`]
//! - [`aggregate`]: the single-pass aggregator and its sharded variant
//!
//! ## Data Flow
//!
//! ```text
//! Vec<PatientJourney>
//!        │
//!        ▼
//! aggregate() / aggregate_parallel()
//!        │
//!        ├──▶ TransitionCount   (patients per (stage, from, to))
//!        ├──▶ TransitionTiming  (days between timed observations)
//!        └──▶ skipped records + warnings
//! ```

pub mod aggregate;
pub mod journey;
pub mod transition;

pub use aggregate::{
    aggregate, aggregate_parallel, AggregateError, AggregateOptions, Aggregation,
    AggregationWarning, MalformedPolicy, MalformedRecord,
};
pub use journey::{Observation, PatientJourney};
pub use transition::{TimingStats, TransitionCount, TransitionKey, TransitionTiming};
