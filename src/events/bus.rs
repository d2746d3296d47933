//! Typed event bus with four independent channels.
//!
//! Each channel has a fixed payload shape and its own registration method,
//! so subscriptions are checked at compile time rather than by string key.
//! Fan-out is synchronous and in subscription order; a listener added after
//! a publish call misses that event. This is an at-most-once, fire-and-forget
//! broadcast, not a durable log (the durable log is the session's message
//! stream).

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use strum_macros::Display;

use crate::events::event::LogMessage;
use crate::task::types::Task;

/// The closed set of channels a listener can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Channel {
    Message,
    Task,
    Exit,
    CiKeepAlive,
}

/// Handle returned by the subscribe methods; used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type MessageListener = Box<dyn FnMut(&LogMessage) + Send>;
pub type TaskListener = Box<dyn FnMut(&Task, bool) + Send>;
pub type ExitListener = Box<dyn FnMut() + Send>;
pub type KeepAliveListener = Box<dyn FnMut(&str) + Send>;

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    message: Vec<(ListenerId, MessageListener)>,
    task: Vec<(ListenerId, TaskListener)>,
    exit: Vec<(ListenerId, ExitListener)>,
    ci_keep_alive: Vec<(ListenerId, KeepAliveListener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn subscribe_message(
        &mut self,
        listener: impl FnMut(&LogMessage) + Send + 'static,
    ) -> ListenerId {
        let id = self.allocate_id();
        self.message.push((id, Box::new(listener)));
        id
    }

    pub fn subscribe_task(
        &mut self,
        listener: impl FnMut(&Task, bool) + Send + 'static,
    ) -> ListenerId {
        let id = self.allocate_id();
        self.task.push((id, Box::new(listener)));
        id
    }

    pub fn subscribe_exit(&mut self, listener: impl FnMut() + Send + 'static) -> ListenerId {
        let id = self.allocate_id();
        self.exit.push((id, Box::new(listener)));
        id
    }

    pub fn subscribe_keep_alive(
        &mut self,
        listener: impl FnMut(&str) + Send + 'static,
    ) -> ListenerId {
        let id = self.allocate_id();
        self.ci_keep_alive.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener from `channel`. Returns whether it was present;
    /// removing an unknown id is a no-op.
    pub fn unsubscribe(&mut self, channel: Channel, id: ListenerId) -> bool {
        fn remove<L>(listeners: &mut Vec<(ListenerId, L)>, id: ListenerId) -> bool {
            let before = listeners.len();
            listeners.retain(|(listener_id, _)| *listener_id != id);
            listeners.len() != before
        }

        match channel {
            Channel::Message => remove(&mut self.message, id),
            Channel::Task => remove(&mut self.task, id),
            Channel::Exit => remove(&mut self.exit, id),
            Channel::CiKeepAlive => remove(&mut self.ci_keep_alive, id),
        }
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        match channel {
            Channel::Message => self.message.len(),
            Channel::Task => self.task.len(),
            Channel::Exit => self.exit.len(),
            Channel::CiKeepAlive => self.ci_keep_alive.len(),
        }
    }

    pub fn publish_message(&mut self, message: &LogMessage) {
        for (id, listener) in &mut self.message {
            invoke(Channel::Message, *id, AssertUnwindSafe(|| listener(message)));
        }
    }

    pub fn publish_task(&mut self, task: &Task, is_final: bool) {
        for (id, listener) in &mut self.task {
            invoke(Channel::Task, *id, AssertUnwindSafe(|| listener(task, is_final)));
        }
    }

    pub fn publish_exit(&mut self) {
        for (id, listener) in &mut self.exit {
            invoke(Channel::Exit, *id, AssertUnwindSafe(|| listener()));
        }
    }

    pub fn publish_keep_alive(&mut self, status: &str) {
        for (id, listener) in &mut self.ci_keep_alive {
            invoke(Channel::CiKeepAlive, *id, AssertUnwindSafe(|| listener(status)));
        }
    }
}

// A panicking listener must not prevent the remaining listeners from running,
// nor abort the reporting call that triggered the publish.
fn invoke<F: FnOnce()>(channel: Channel, id: ListenerId, call: AssertUnwindSafe<F>) {
    if let Err(panic) = catch_unwind(call) {
        log::error!(
            "{} listener {} panicked: {}",
            channel,
            id,
            panic_message(&*panic)
        );
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("opaque panic payload")
}
