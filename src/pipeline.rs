//! Load-aggregate-render batch run.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Settings;
use crate::data::{aggregate, aggregate_parallel, Aggregation};
use crate::render::{DiagramRenderer, LinkWeight, Palette, SankeyDiagram, TableRenderer};
use crate::source::{resolve_stages, EventLogSource, InputFormat, JourneySource, WideCsvSource};

/// Open the file source matching the configured input format.
pub fn open_source(settings: &Settings, input: &Path) -> Result<Box<dyn JourneySource>> {
    let delimiter = settings.delimiter_byte()?;
    let source: Box<dyn JourneySource> = match settings.format {
        InputFormat::Wide => Box::new(
            WideCsvSource::new(input, settings.wide.clone()).with_delimiter(delimiter),
        ),
        InputFormat::Events => Box::new(
            EventLogSource::new(input, settings.events.clone()).with_delimiter(delimiter),
        ),
    };
    Ok(source)
}

/// Load every journey from `source` and aggregate them.
///
/// The stage count comes from the settings, then the source layout, then
/// the longest journey. An inferred count below two means no journey can
/// form a transition, which is reported as empty input rather than an error.
pub fn run(settings: &Settings, source: &mut dyn JourneySource) -> Result<Aggregation> {
    let journeys = source
        .load()
        .with_context(|| format!("loading journeys from {}", source.description()))?;
    info!(source = source.description(), journeys = journeys.len(), "loaded journeys");

    let stages = resolve_stages(settings.stages, source, &journeys);
    if settings.stages.is_none() {
        info!(stages, "inferred stage count");
        if stages < 2 {
            return Ok(Aggregation::without_transitions(stages));
        }
    }
    let options = settings.aggregate_options(stages);

    let aggregation = if settings.jobs > 1 {
        aggregate_parallel(&journeys, &options, settings.jobs)?
    } else {
        aggregate(&journeys, &options)?
    };

    if !aggregation.skipped.is_empty() {
        warn!(
            skipped = aggregation.skipped.len(),
            stages, "some journeys did not have the expected number of stages"
        );
    }
    Ok(aggregation)
}

/// Build the diagram for an aggregation using the configured weight,
/// palette and title.
pub fn diagram(settings: &Settings, aggregation: &Aggregation) -> SankeyDiagram {
    SankeyDiagram::from_aggregation(aggregation, settings.weight, settings.palette())
        .with_title(settings.title.clone())
}

/// Plain-text report of every counted transition.
///
/// Always weighted by patient count, so each stage block adds up to the
/// accepted journeys whatever weight the diagram uses.
pub fn report(aggregation: &Aggregation) -> Result<String> {
    let diagram =
        SankeyDiagram::from_aggregation(aggregation, LinkWeight::Count, Palette::default());
    TableRenderer::default().render(&diagram)
}
