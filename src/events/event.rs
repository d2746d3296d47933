//! Payload types carried on the event channels

use serde::{Deserialize, Serialize};

use crate::core::config::LogLevel;
use crate::core::styles::MessageColor;

/// A single entry in the append-only message stream. Immutable once created;
/// messages are never removed, only filtered at delivery or read-back time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub content: String,
    pub color: Option<MessageColor>,
    pub level: LogLevel,
}

impl LogMessage {
    pub fn new(content: impl Into<String>, level: LogLevel) -> Self {
        Self {
            content: content.into(),
            color: None,
            level,
        }
    }

    pub fn verbose(content: impl Into<String>) -> Self {
        Self::new(content, LogLevel::Verbose)
    }

    pub fn warn(content: impl Into<String>) -> Self {
        Self::new(content, LogLevel::Warn)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(content, LogLevel::Error)
    }

    pub fn with_color(mut self, color: MessageColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Render the message content, applying its color tag when one is set
    /// and coloring is enabled.
    pub fn render(&self, color_enabled: bool) -> String {
        match self.color {
            Some(color) => color.paint(&self.content, color_enabled),
            None => self.content.clone(),
        }
    }
}
