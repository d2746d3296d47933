//! Worker-to-orchestrator protocol

pub mod message;

pub use message::{dispatch, LintFinding, WorkerMessage, MAX_SOURCE_LENGTH};
