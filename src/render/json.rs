//! JSON link-list export.

use anyhow::Result;
use serde::Serialize;

use super::{DiagramRenderer, Link, LinkWeight, SankeyDiagram};

#[derive(Serialize)]
struct Export<'a> {
    stages: usize,
    patients: usize,
    weight: LinkWeight,
    links: &'a [Link],
}

/// Writes the diagram's links as pretty-printed JSON.
///
/// ```json
/// { "stages": 2, "patients": 3, "weight": "count",
///   "links": [ { "stage": 0, "source": "Diabetes", "target": "Diabetes", "count": 1, "value": 1.0 } ] }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl DiagramRenderer for JsonRenderer {
    fn render(&self, diagram: &SankeyDiagram) -> Result<String> {
        let export = Export {
            stages: diagram.stages,
            patients: diagram.patients,
            weight: diagram.weight,
            links: &diagram.links,
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
