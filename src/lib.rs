//! # journey-sankey
//!
//! Aggregates patient condition journeys into stage-by-stage transition
//! counts and draws them as Sankey diagrams, where link width encodes how
//! many patients moved from one condition or treatment to another.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          pipeline                            │
//! │  ┌─────────┐    ┌────────────┐    ┌──────────┐    ┌────────┐ │
//! │  │ source  │───▶│    data    │───▶│  render  │───▶│  file  │ │
//! │  │ (input) │    │(aggregate) │    │(diagram) │    │/stdout │ │
//! │  └─────────┘    └────────────┘    └──────────┘    └────────┘ │
//! │       ▲                                                      │
//! │       └── WideCsvSource | EventLogSource | MemorySource      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: the [`JourneySource`] trait and its file and memory implementations
//! - **[`data`]**: [`PatientJourney`], [`TransitionCount`] and the aggregator
//! - **[`render`]**: [`SankeyDiagram`] plus HTML, JSON and text renderers
//! - **[`config`]**: layered [`Settings`]
//! - **[`pipeline`]**: glue used by the `journey-sankey` binary
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # One row per patient, one column per visit
//! journey-sankey cohort.csv --id-column patient --html sankey.html
//!
//! # Conditions event log (PATIENT, START, DESCRIPTION), strict stage check
//! journey-sankey conditions.csv --format events --stages 3 --strict --export links.json
//! ```
//!
//! ### As a library
//!
//! ```
//! use journey_sankey::{aggregate, AggregateOptions, PatientJourney};
//!
//! let journeys = vec![
//!     PatientJourney::from_labels("P1", ["Diabetes", "Hypertension"]),
//!     PatientJourney::from_labels("P2", ["Diabetes", "Diabetes"]),
//!     PatientJourney::from_labels("P3", ["Hypertension", "Hypertension"]),
//! ];
//!
//! let result = aggregate(&journeys, &AggregateOptions::new(2)).unwrap();
//! assert_eq!(result.counts.get(0, "Diabetes", "Hypertension"), 1);
//! assert_eq!(result.counts.total_at_stage(0), 3);
//! ```
//!
//! ### Rendering
//!
//! ```
//! use journey_sankey::{
//!     aggregate, AggregateOptions, DiagramRenderer, HtmlRenderer, LinkWeight, Palette,
//!     PatientJourney, SankeyDiagram,
//! };
//!
//! let journeys = vec![PatientJourney::from_labels("P1", ["Asthma", "Inhaler"])];
//! let result = aggregate(&journeys, &AggregateOptions::new(2)).unwrap();
//! let diagram = SankeyDiagram::from_aggregation(&result, LinkWeight::Count, Palette::default());
//!
//! let html = HtmlRenderer::default().render(&diagram).unwrap();
//! assert!(html.contains("sankey"));
//! ```

pub mod config;
pub mod data;
pub mod pipeline;
pub mod render;
pub mod source;

pub use config::Settings;
pub use data::{
    aggregate, aggregate_parallel, AggregateError, AggregateOptions, Aggregation,
    AggregationWarning, MalformedPolicy, MalformedRecord, Observation, PatientJourney,
    TimingStats, TransitionCount, TransitionKey, TransitionTiming,
};
pub use render::{
    DiagramRenderer, HtmlRenderer, JsonRenderer, LinkWeight, Palette, SankeyDiagram,
    TableRenderer,
};
pub use source::{
    EventColumns, EventLogSource, InputFormat, JourneySource, MemorySource, SourceError,
    WideCsvSource, WideLayout,
};
