//! Semantic color tags carried by messages and tasks.
//!
//! Coloring is applied only when the `enabled` flag passed to `paint()` is
//! true, avoiding global mutable state. Renderers that want plain text simply
//! pass `false`.

use colored::Color;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Semantic color tag attached to a message or task. The tag names a role
/// (success, in-progress, failure), not a terminal escape sequence; mapping
/// to ANSI happens in [`MessageColor::paint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageColor {
    Green,
    Yellow,
    Red,
}

impl MessageColor {
    pub fn color(self) -> Color {
        match self {
            MessageColor::Green => Color::Green,
            MessageColor::Yellow => Color::Yellow,
            MessageColor::Red => Color::Red,
        }
    }

    fn ansi_code(self) -> &'static str {
        match self.color() {
            Color::Green => "32",
            Color::Yellow => "33",
            Color::Red => "31",
            _ => "39",
        }
    }

    /// Wrap `text` in the tag's ANSI escape codes when `enabled` is true.
    pub fn paint(self, text: &str, enabled: bool) -> String {
        if !enabled {
            return text.to_string();
        }
        format!("\x1b[{}m{}\x1b[0m", self.ansi_code(), text)
    }
}
