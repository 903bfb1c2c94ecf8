//! Plain-text transition table.

use std::borrow::Cow;
use std::fmt::Write;

use anyhow::Result;

use super::{DiagramRenderer, SankeyDiagram};

/// Renders one block per stage transition listing every link, its patient
/// count and, when timestamps were available, the average days elapsed.
#[derive(Debug, Clone)]
pub struct TableRenderer {
    label_width: usize,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self { label_width: 28 }
    }
}

impl TableRenderer {
    pub fn with_label_width(mut self, width: usize) -> Self {
        self.label_width = width.max(4);
        self
    }
}

/// Shorten `label` to `width` characters, marking the cut with an ellipsis.
fn clip(label: &str, width: usize) -> Cow<'_, str> {
    if label.char_indices().nth(width).is_none() {
        return Cow::Borrowed(label);
    }
    let end = label
        .char_indices()
        .nth(width.saturating_sub(1))
        .map_or(label.len(), |(i, _)| i);
    Cow::Owned(format!("{}…", &label[..end]))
}

impl DiagramRenderer for TableRenderer {
    fn render(&self, diagram: &SankeyDiagram) -> Result<String> {
        let w = self.label_width;
        let mut out = String::new();

        writeln!(
            out,
            "{} patients, {} stages, {} links",
            diagram.patients,
            diagram.stages,
            diagram.links.len()
        )?;
        if diagram.links.is_empty() {
            writeln!(out, "(no transitions)")?;
            return Ok(out);
        }

        let mut current_stage = None;
        for link in &diagram.links {
            if current_stage != Some(link.stage) {
                current_stage = Some(link.stage);
                let stage_total: u64 = diagram
                    .links
                    .iter()
                    .filter(|l| l.stage == link.stage)
                    .map(|l| l.count)
                    .sum();
                writeln!(out)?;
                writeln!(
                    out,
                    "Stage {} → {} ({} patients)",
                    link.stage + 1,
                    link.stage + 2,
                    stage_total
                )?;
            }

            let average = link
                .average_days
                .map(|d| format!("{:>10.1}d", d))
                .unwrap_or_default();
            writeln!(
                out,
                "  {:<w$} → {:<w$} {:>7}{}",
                clip(&link.source, w),
                clip(&link.target, w),
                link.count,
                average,
                w = w
            )?;
        }

        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{aggregate, AggregateOptions, PatientJourney};
    use crate::render::{LinkWeight, Palette};

    fn render(journeys: Vec<PatientJourney>, stages: usize) -> String {
        let aggregation = aggregate(&journeys, &AggregateOptions::new(stages)).unwrap();
        let diagram =
            SankeyDiagram::from_aggregation(&aggregation, LinkWeight::Count, Palette::default());
        TableRenderer::default().render(&diagram).unwrap()
    }

    #[test]
    fn groups_links_by_stage() {
        let table = render(
            vec![
                PatientJourney::from_labels("a", ["A", "B", "C"]),
                PatientJourney::from_labels("b", ["A", "B", "B"]),
            ],
            3,
        );

        assert!(table.starts_with("2 patients, 3 stages, 3 links"));
        assert!(table.contains("Stage 1 → 2 (2 patients)"));
        assert!(table.contains("Stage 2 → 3 (2 patients)"));
        let line = table.lines().find(|l| l.trim_start().starts_with("A ")).unwrap();
        assert!(line.trim_end().ends_with('2'));
    }

    #[test]
    fn empty_diagram_says_so() {
        let table = render(Vec::new(), 2);
        assert!(table.contains("(no transitions)"));
    }

    #[test]
    fn long_labels_are_truncated() {
        assert_eq!(clip("Hypertension", 6), "Hyper…");
        assert_eq!(clip("Flu", 6), "Flu");
        assert_eq!(clip("Anämie", 6), "Anämie");
        assert_eq!(clip("Schlafstörung", 6), "Schla…");
    }
}
