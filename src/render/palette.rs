//! Label color assignment for diagrams.

use std::collections::HashMap;

/// Default categorical palette, chosen to stay distinguishable for
/// color-blind readers.
pub const DEFAULT_COLORS: [&str; 7] = [
    "#0077BB", // vivid blue
    "#33BBEE", // light blue
    "#009988", // teal
    "#EE7733", // orange
    "#CC3311", // red
    "#EE3377", // pink
    "#BBBBBB", // light gray
];

/// Assigns a color to each label in order of first appearance, cycling
/// through the palette once it runs out.
///
/// The same label always maps to the same color, so a condition keeps its
/// color in every stage column of the diagram.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<String>,
    assigned: HashMap<String, usize>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(DEFAULT_COLORS.iter().map(|c| c.to_string()).collect())
    }
}

impl Palette {
    /// Create a palette from hex colors. An empty list falls back to the
    /// default colors.
    pub fn new(colors: Vec<String>) -> Self {
        let colors = if colors.is_empty() {
            DEFAULT_COLORS.iter().map(|c| c.to_string()).collect()
        } else {
            colors
        };
        Self {
            colors,
            assigned: HashMap::new(),
        }
    }

    /// Color for `label`, assigning the next palette slot on first use.
    pub fn color_for(&mut self, label: &str) -> &str {
        let next = self.assigned.len();
        let slot = *self.assigned.entry(label.to_string()).or_insert(next);
        &self.colors[slot % self.colors.len()]
    }
}

/// Convert `#RRGGBB` to a CSS `rgba()` string with the given opacity.
///
/// Anything that is not a six-digit hex color is returned unchanged.
pub fn with_alpha(hex: &str, alpha: f32) -> String {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return hex.to_string();
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16);
    match (channel(0), channel(2), channel(4)) {
        (Ok(r), Ok(g), Ok(b)) => format!("rgba({}, {}, {}, {})", r, g, b, alpha),
        _ => hex.to_string(),
    }
}
