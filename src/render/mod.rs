//! Sankey diagram construction and rendering.
//!
//! [`SankeyDiagram::from_aggregation`] turns transition counts into nodes
//! and weighted links; a [`DiagramRenderer`] then writes the diagram out.
//!
//! ## Renderers
//!
//! - [`HtmlRenderer`]: standalone page drawing the diagram with plotly.js
//! - [`JsonRenderer`]: `(stage, source, target, count)` link list
//! - [`TableRenderer`]: plain-text per-stage table for the terminal

mod html;
mod json;
mod palette;
mod table;

pub use html::HtmlRenderer;
pub use json::JsonRenderer;
pub use palette::{with_alpha, Palette, DEFAULT_COLORS};
pub use table::TableRenderer;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::Aggregation;

/// Default diagram title.
pub const DEFAULT_TITLE: &str = "Sankey Diagram of Patient Condition Journeys";

/// Opacity applied to link colors so overlapping flows stay readable.
const LINK_ALPHA: f32 = 0.5;

/// Quantity that sets the width of each link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LinkWeight {
    /// Number of patients making the transition.
    #[default]
    Count,
    /// Total days spent between the two observations, over all patients.
    TotalDays,
    /// Average days spent between the two observations.
    AverageDays,
}

/// A diagram node: one label at one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub stage: usize,
    pub label: String,
    pub color: String,
}

/// A weighted edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub stage: usize,
    pub source: String,
    pub target: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_days: Option<f64>,
    /// Width of the link under the diagram's [`LinkWeight`].
    pub value: f64,
    #[serde(skip)]
    pub source_node: usize,
    #[serde(skip)]
    pub target_node: usize,
    #[serde(skip)]
    pub color: String,
}

/// Everything a renderer needs to draw one diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct SankeyDiagram {
    pub title: String,
    pub stages: usize,
    pub patients: usize,
    pub weight: LinkWeight,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl SankeyDiagram {
    /// Build a diagram from an aggregation.
    ///
    /// Nodes are created in transition-key order (stage, source, target),
    /// which also fixes the order in which labels claim palette colors.
    /// Under the day-based weights, links without timing data or with a
    /// non-positive value are left out.
    pub fn from_aggregation(
        aggregation: &Aggregation,
        weight: LinkWeight,
        mut palette: Palette,
    ) -> Self {
        let mut nodes: Vec<Node> = Vec::new();
        let mut node_index: HashMap<(usize, String), usize> = HashMap::new();
        let mut node_for = |stage: usize, label: &str, palette: &mut Palette| -> usize {
            let key = (stage, label.to_string());
            if let Some(&i) = node_index.get(&key) {
                return i;
            }
            nodes.push(Node {
                stage,
                label: label.to_string(),
                color: palette.color_for(label).to_string(),
            });
            node_index.insert(key, nodes.len() - 1);
            nodes.len() - 1
        };

        let mut links = Vec::new();
        for (key, &count) in &aggregation.counts {
            let timing = aggregation.timing.get(key);
            let value = match weight {
                LinkWeight::Count => Some(count as f64),
                LinkWeight::TotalDays => timing.map(|t| t.total_days as f64),
                LinkWeight::AverageDays => timing.map(|t| t.average_days()),
            };
            let Some(value) = value.filter(|v| *v > 0.0) else {
                continue;
            };

            let source_node = node_for(key.stage, &key.source, &mut palette);
            let target_node = node_for(key.stage + 1, &key.target, &mut palette);
            links.push(Link {
                stage: key.stage,
                source: key.source.clone(),
                target: key.target.clone(),
                count,
                total_days: timing.map(|t| t.total_days),
                average_days: timing.map(|t| t.average_days()),
                value,
                source_node,
                target_node,
                color: String::new(),
            });
        }
        for link in &mut links {
            link.color = with_alpha(&nodes[link.source_node].color, LINK_ALPHA);
        }

        debug!(nodes = nodes.len(), links = links.len(), ?weight, "built diagram");
        Self {
            title: DEFAULT_TITLE.to_string(),
            stages: aggregation.stages,
            patients: aggregation.accepted,
            weight,
            nodes,
            links,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Seam between the aggregation core and whatever draws the diagram.
pub trait DiagramRenderer {
    /// Render the diagram to a document.
    fn render(&self, diagram: &SankeyDiagram) -> Result<String>;

    /// File extension conventionally used for the rendered document.
    fn extension(&self) -> &'static str;

    /// Render and write the document to `path`.
    fn write_to(&self, diagram: &SankeyDiagram, path: &Path) -> Result<()> {
        let document = self.render(diagram)?;
        fs::write(path, document)
            .with_context(|| format!("writing {} output to {}", self.extension(), path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{aggregate, AggregateOptions, Observation, PatientJourney};
    use chrono::NaiveDate;

    fn example_aggregation() -> Aggregation {
        let journeys = vec![
            PatientJourney::from_labels("P1", ["Diabetes", "Hypertension"]),
            PatientJourney::from_labels("P2", ["Diabetes", "Diabetes"]),
            PatientJourney::from_labels("P3", ["Hypertension", "Hypertension"]),
        ];
        aggregate(&journeys, &AggregateOptions::new(2)).unwrap()
    }

    #[test]
    fn nodes_are_per_stage_and_label() {
        let diagram =
            SankeyDiagram::from_aggregation(&example_aggregation(), LinkWeight::Count, Palette::default());

        let nodes: Vec<(usize, &str)> =
            diagram.nodes.iter().map(|n| (n.stage, n.label.as_str())).collect();
        assert_eq!(
            nodes,
            vec![
                (0, "Diabetes"),
                (1, "Diabetes"),
                (1, "Hypertension"),
                (0, "Hypertension"),
            ]
        );
        assert_eq!(diagram.patients, 3);
        assert_eq!(diagram.stages, 2);
        assert_eq!(diagram.title, DEFAULT_TITLE);
    }

    #[test]
    fn label_color_shared_across_stages() {
        let diagram =
            SankeyDiagram::from_aggregation(&example_aggregation(), LinkWeight::Count, Palette::default());

        let colors: Vec<&str> = diagram
            .nodes
            .iter()
            .filter(|n| n.label == "Diabetes")
            .map(|n| n.color.as_str())
            .collect();
        assert_eq!(colors, vec!["#0077BB", "#0077BB"]);

        let link = &diagram.links[0];
        assert_eq!(link.source, "Diabetes");
        assert_eq!(link.color, "rgba(0, 119, 187, 0.5)");
    }

    #[test]
    fn count_weight_uses_patient_counts() {
        let diagram =
            SankeyDiagram::from_aggregation(&example_aggregation(), LinkWeight::Count, Palette::default());

        assert_eq!(diagram.links.len(), 3);
        let total: f64 = diagram.links.iter().map(|l| l.value).sum();
        assert_eq!(total, 3.0);
        for link in &diagram.links {
            assert_eq!(diagram.nodes[link.source_node].label, link.source);
            assert_eq!(diagram.nodes[link.target_node].label, link.target);
            assert_eq!(diagram.nodes[link.target_node].stage, link.stage + 1);
        }
    }

    #[test]
    fn day_weights_drop_untimed_links() {
        let at = |d: u32| {
            NaiveDate::from_ymd_opt(2022, 1, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        let journeys = vec![
            PatientJourney::new(
                "a",
                vec![Observation::at("Flu", at(1)), Observation::at("Pneumonia", at(5))],
            ),
            PatientJourney::new(
                "b",
                vec![Observation::at("Flu", at(2)), Observation::at("Pneumonia", at(4))],
            ),
            PatientJourney::from_labels("c", ["Flu", "Recovered"]),
        ];
        let aggregation = aggregate(&journeys, &AggregateOptions::new(2)).unwrap();

        let total =
            SankeyDiagram::from_aggregation(&aggregation, LinkWeight::TotalDays, Palette::default());
        assert_eq!(total.links.len(), 1);
        assert_eq!(total.links[0].value, 6.0);
        assert_eq!(total.links[0].count, 2);

        let average =
            SankeyDiagram::from_aggregation(&aggregation, LinkWeight::AverageDays, Palette::default());
        assert_eq!(average.links[0].value, 3.0);
    }

    #[test]
    fn empty_aggregation_gives_empty_diagram() {
        let aggregation = aggregate(&[], &AggregateOptions::new(2)).unwrap();
        let diagram =
            SankeyDiagram::from_aggregation(&aggregation, LinkWeight::Count, Palette::default());
        assert!(diagram.nodes.is_empty());
        assert!(diagram.links.is_empty());
    }
}
