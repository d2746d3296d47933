//! Typed publish/subscribe channels for progress events

pub mod bus;
pub mod event;

pub use bus::{Channel, EventBus, ListenerId};
pub use event::LogMessage;
