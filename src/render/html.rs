//! Standalone HTML page drawing the diagram with plotly.js.

use anyhow::Result;
use serde_json::json;

use super::{DiagramRenderer, SankeyDiagram};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Renders a self-contained HTML document with a plotly Sankey trace.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    script_src: String,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self {
            script_src: PLOTLY_CDN.to_string(),
        }
    }
}

impl HtmlRenderer {
    /// Load plotly.js from a different location, e.g. a local copy.
    pub fn with_script_src(mut self, src: impl Into<String>) -> Self {
        self.script_src = src.into();
        self
    }

    fn figure(diagram: &SankeyDiagram) -> serde_json::Value {
        let trace = json!({
            "type": "sankey",
            "arrangement": "snap",
            "node": {
                "pad": 15,
                "thickness": 20,
                "line": { "color": "black", "width": 0.5 },
                "label": diagram.nodes.iter().map(|n| n.label.as_str()).collect::<Vec<_>>(),
                "color": diagram.nodes.iter().map(|n| n.color.as_str()).collect::<Vec<_>>(),
            },
            "link": {
                "source": diagram.links.iter().map(|l| l.source_node).collect::<Vec<_>>(),
                "target": diagram.links.iter().map(|l| l.target_node).collect::<Vec<_>>(),
                "value": diagram.links.iter().map(|l| l.value).collect::<Vec<_>>(),
                "color": diagram.links.iter().map(|l| l.color.as_str()).collect::<Vec<_>>(),
            },
        });
        let layout = json!({
            "title": { "text": diagram.title, "font": { "size": 18, "color": "black" } },
            "font": { "size": 16, "color": "black" },
        });
        json!({ "data": [trace], "layout": layout })
    }
}

/// Escape text for use in HTML element content.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl DiagramRenderer for HtmlRenderer {
    fn render(&self, diagram: &SankeyDiagram) -> Result<String> {
        // Labels are arbitrary text; keep them from closing the script element.
        let figure = serde_json::to_string(&Self::figure(diagram))?.replace("</", "<\\/");
        let title = escape_html(&diagram.title);
        let script_src = escape_html(&self.script_src);

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{script_src}"></script>
</head>
<body>
<div id="sankey" style="width:100%;height:90vh;"></div>
<script>
const figure = {figure};
Plotly.newPlot("sankey", figure.data, figure.layout, {{ responsive: true }});
</script>
</body>
</html>
"#
        ))
    }

    fn extension(&self) -> &'static str {
        "html"
    }
}
