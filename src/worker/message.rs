//! Wire protocol between scan workers and the orchestrating session.
//!
//! Workers serialize one [`WorkerMessage`] per event; the orchestrator
//! deserializes and routes it through [`dispatch`]. The tagged representation
//! keeps the message type explicit on the wire.

use serde::{Deserialize, Serialize};

use crate::progress::session::ScanSession;

/// Maximum number of characters of offending source carried per finding.
pub const MAX_SOURCE_LENGTH: usize = 1000;

const TRUNCATION_SUFFIX: &str = "...";

/// One lint finding produced by a worker. Field names follow the JSON the
/// linters emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintFinding {
    pub rule: Option<String>,
    pub severity: u8,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub source: Option<String>,
}

/// Message sent from a worker to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// A repository finished linting; carries every finding.
    OnResult { messages: Vec<LintFinding> },
    /// The worker process died before producing a result.
    OnCrash {
        #[serde(default)]
        error_code: Option<String>,
    },
    /// One more file finished within the current repository.
    OnProgress { current_file_index: usize },
}

/// Cap a finding's source excerpt. Char-based so a multi-byte boundary can
/// never split a code point.
pub fn truncate_source(source: &str) -> String {
    if source.chars().count() <= MAX_SOURCE_LENGTH {
        return source.to_string();
    }
    let mut truncated: String = source.chars().take(MAX_SOURCE_LENGTH).collect();
    truncated.push_str(TRUNCATION_SUFFIX);
    truncated
}

/// Route one worker message into the session. Returns the repository's
/// findings for `OnResult`, with source excerpts capped; the other message
/// types only update progress state and return nothing.
pub async fn dispatch(
    session: &ScanSession,
    repository: &str,
    message: WorkerMessage,
) -> Option<Vec<LintFinding>> {
    match message {
        WorkerMessage::OnResult { mut messages } => {
            for finding in &mut messages {
                if let Some(source) = finding.source.take() {
                    finding.source = Some(truncate_source(&source));
                }
            }
            session.on_lint_end(repository, messages.len()).await;
            Some(messages)
        }
        WorkerMessage::OnCrash { error_code } => {
            session
                .on_worker_crash(repository, error_code.as_deref())
                .await;
            None
        }
        WorkerMessage::OnProgress { current_file_index } => {
            session.on_file_lint_end(repository, current_file_index).await;
            None
        }
    }
}
