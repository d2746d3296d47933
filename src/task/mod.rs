//! Repository task state and registry

pub mod registry;
pub mod types;

pub use registry::TaskRegistry;
pub use types::{Task, TaskStep, TaskUpdate};
