//! Task types shared across the orchestration core.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::core::styles::MessageColor;

/// Pipeline stage a repository's scan currently occupies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStep {
    Start,
    Clone,
    Pull,
    Read,
    Lint,
}

/// Live progress state of one repository's scan. Exactly one task exists per
/// repository while that repository is in flight; the registry owns it
/// exclusively and hands out clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub repository: String,
    pub step: TaskStep,
    pub color: Option<MessageColor>,
    pub file_count: Option<usize>,
    pub current_file_index: Option<usize>,
    /// Insertion-ordered, duplicate-free. Only grows through
    /// [`TaskRegistry::add_warning`](crate::task::registry::TaskRegistry::add_warning).
    pub warnings: Vec<String>,
}

impl Task {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            step: TaskStep::Start,
            color: None,
            file_count: None,
            current_file_index: None,
            warnings: Vec::new(),
        }
    }

    /// Shallow-merge the update's set fields into this task. Warnings are
    /// deliberately not part of an update; they are appended through the
    /// registry's dedicated operation.
    pub fn apply(&mut self, update: TaskUpdate) {
        if let Some(step) = update.step {
            self.step = step;
        }
        if let Some(color) = update.color {
            self.color = Some(color);
        }
        if let Some(file_count) = update.file_count {
            self.file_count = Some(file_count);
        }
        if let Some(current_file_index) = update.current_file_index {
            self.current_file_index = Some(current_file_index);
        }
    }
}

/// Partial field set merged into a task by `upsert`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub step: Option<TaskStep>,
    pub color: Option<MessageColor>,
    pub file_count: Option<usize>,
    pub current_file_index: Option<usize>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: TaskStep) -> Self {
        self.step = Some(step);
        self
    }

    pub fn color(mut self, color: MessageColor) -> Self {
        self.color = Some(color);
        self
    }

    pub fn file_count(mut self, file_count: usize) -> Self {
        self.file_count = Some(file_count);
        self
    }

    pub fn current_file_index(mut self, current_file_index: usize) -> Self {
        self.current_file_index = Some(current_file_index);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_starts_at_start_step() {
        let task = Task::new("org/repo");
        assert_eq!(task.repository, "org/repo");
        assert_eq!(task.step, TaskStep::Start);
        assert!(task.warnings.is_empty());
    }

    #[test]
    fn test_apply_merges_only_set_fields() {
        let mut task = Task::new("org/repo");
        task.apply(
            TaskUpdate::new()
                .step(TaskStep::Lint)
                .file_count(12)
                .current_file_index(0),
        );

        assert_eq!(task.step, TaskStep::Lint);
        assert_eq!(task.file_count, Some(12));
        assert_eq!(task.current_file_index, Some(0));

        // An empty update leaves everything in place
        task.apply(TaskUpdate::new());
        assert_eq!(task.step, TaskStep::Lint);
        assert_eq!(task.file_count, Some(12));
    }

    #[test]
    fn test_step_names_match_pipeline_labels() {
        assert_eq!(TaskStep::Start.to_string(), "START");
        assert_eq!(TaskStep::Clone.to_string(), "CLONE");
        assert_eq!(TaskStep::Pull.to_string(), "PULL");
        assert_eq!(TaskStep::Read.to_string(), "READ");
        assert_eq!(TaskStep::Lint.to_string(), "LINT");
        assert_eq!("LINT".parse::<TaskStep>().unwrap(), TaskStep::Lint);
    }
}
