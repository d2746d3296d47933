//! In-memory registry of in-flight repository tasks.
//!
//! Keyed by repository identifier for constant-time lookup; a side list of
//! keys preserves insertion order so `snapshot()` reflects the order in which
//! repositories entered the pipeline.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::task::types::{Task, TaskUpdate};

#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Task>,
    order: Vec<String>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `update` into the task for `repository`, creating the task if
    /// none exists. Returns a clone of the resulting task.
    pub fn upsert(&mut self, repository: &str, update: TaskUpdate) -> Task {
        match self.tasks.entry(repository.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().apply(update);
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                self.order.push(repository.to_string());
                let mut task = Task::new(repository);
                task.apply(update);
                entry.insert(task).clone()
            }
        }
    }

    pub fn get(&self, repository: &str) -> Option<&Task> {
        self.tasks.get(repository)
    }

    /// Remove and return the task for `repository`, if present.
    pub fn remove(&mut self, repository: &str) -> Option<Task> {
        let removed = self.tasks.remove(repository);
        if removed.is_some() {
            self.order.retain(|key| key != repository);
        }
        removed
    }

    /// Append `warning` to the task's warnings only if it is not already
    /// present. Returns whether the warning was newly added; `false` also
    /// covers the case where no task exists for `repository`. Enables
    /// "log once per distinct warning" semantics upstream.
    pub fn add_warning(&mut self, repository: &str, warning: &str) -> bool {
        let Some(task) = self.tasks.get_mut(repository) else {
            return false;
        };
        if task.warnings.iter().any(|existing| existing == warning) {
            return false;
        }
        task.warnings.push(warning.to_string());
        true
    }

    /// Point-in-time view of all in-flight tasks, in insertion order.
    pub fn snapshot(&self) -> Vec<Task> {
        self.order
            .iter()
            .filter_map(|key| self.tasks.get(key).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
