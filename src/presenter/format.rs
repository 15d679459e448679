//! Result text and colour band.

use serde::Serialize;

/// Colour band for a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VibeBand {
    Low,
    Mid,
    High,
}

impl VibeBand {
    #[must_use]
    pub fn for_percentage(percentage: u8) -> Self {
        match percentage {
            0..30 => Self::Low,
            30..70 => Self::Mid,
            _ => Self::High,
        }
    }

    /// CSS custom property the popup paints the percentage with.
    #[must_use]
    pub fn css_var(self) -> &'static str {
        match self {
            Self::Low => "--bad-vibe-color",
            Self::Mid => "--medium-vibe-color",
            Self::High => "--good-vibe-color",
        }
    }
}

/// Render an analyzer reply as `"{p}% - {main}"`, plus `"\n\nTip: {tip}"`
/// when the reply carries one.
///
/// A leading echo of the percentage and any leading dashes are dropped
/// first, so `"40% - Meh. Tip: Ask more."` and `"Meh. Tip: Ask more."`
/// render the same.
#[must_use]
pub fn format_result_message(percentage: u8, explanation: &str) -> String {
    let echo = format!("{percentage}%");
    let rest = match explanation.strip_prefix(&echo) {
        Some(stripped) => stripped.trim(),
        None => explanation,
    };
    let rest = rest.trim_start_matches(|c: char| c == '-' || c.is_whitespace());

    let (main, tip) = match rest.split_once("Tip:") {
        Some((main, tip)) => (main, tip.trim()),
        None => (rest, ""),
    };

    let mut out = format!("{percentage}% - {}", main.trim());
    if !tip.is_empty() {
        out.push_str("\n\nTip: ");
        out.push_str(tip);
    }
    out
}

#[cfg(test)]
#[path = "format_test.rs"]
mod tests;
