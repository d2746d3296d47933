//! Scan session façade
//!
//! `ScanSession` is the single stateful object the rest of the system talks
//! to: workers report pipeline events into it, renderers subscribe to its
//! channels, and the embedding caller finishes it once every repository has
//! been scanned. One session is constructed per scan run and passed around by
//! handle; there is no process-global instance.
//!
//! All state lives behind one async mutex, so mutations are serialized and
//! publishes happen synchronously in call order. Listeners must not call back
//! into the session they are subscribed to.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::core::config::{CompletionHook, LogLevel, ScanConfig, ScanResults};
use crate::core::styles::MessageColor;
use crate::events::bus::{panic_message, Channel, EventBus, ListenerId};
use crate::events::event::LogMessage;
use crate::progress::{filter, templates};
use crate::task::registry::TaskRegistry;
use crate::task::types::{Task, TaskStep, TaskUpdate};

/// Warning key used to deduplicate worker crash reports per repository.
/// Deliberately fixed: repeated crashes with different error codes on the
/// same repository are still reported once.
const WORKER_CRASH_WARNING: &str = "worker-crash";

/// One-shot, linear shutdown state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    Finalizing,
    AwaitingHook,
    Notifying,
    Done,
}

struct SessionState {
    log_level: LogLevel,
    ci: bool,
    messages: Vec<LogMessage>,
    registry: TaskRegistry,
    bus: EventBus,
    scanned_repositories: usize,
    run: RunState,
    on_complete: Option<CompletionHook>,
}

impl SessionState {
    /// Append to the message stream unconditionally; deliver to subscribers
    /// only when visible. Both sides must agree for a given level, which they
    /// do because `messages()` applies the same predicate at read time.
    fn add_message(&mut self, message: LogMessage) {
        self.messages.push(message.clone());
        if filter::is_message_visible(&message, self.log_level) {
            self.bus.publish_message(&message);
        }
    }

    fn update_task(&mut self, repository: &str, update: TaskUpdate) {
        let task = self.registry.upsert(repository, update);
        if filter::is_task_visible(self.ci, self.log_level) {
            self.bus.publish_task(&task, false);
        }
    }

    /// Returns whether the warning was newly added; a fresh warning is also
    /// delivered as a task update.
    fn add_task_warning(&mut self, repository: &str, warning: &str) -> bool {
        if !self.registry.add_warning(repository, warning) {
            return false;
        }
        if filter::is_task_visible(self.ci, self.log_level) {
            if let Some(task) = self.registry.get(repository) {
                let task = task.clone();
                self.bus.publish_task(&task, false);
            }
        }
        true
    }

    fn publish_ci_status(&mut self) {
        // Never filtered: the whole point is to produce output, whatever the
        // configured level.
        let status = templates::ci_status(self.scanned_repositories, &self.registry.snapshot());
        self.bus.publish_keep_alive(&status);
    }

    fn reporting_allowed(&self, call: &str) -> bool {
        if self.run == RunState::Done {
            log::warn!("{call} called after the scan finished; ignoring");
            return false;
        }
        true
    }
}

/// Handle to one scan run's progress state. Cheap to clone; all clones share
/// the same state.
///
/// When CI mode is enabled the constructor spawns the keep-alive task, so the
/// session must then be created inside a Tokio runtime.
#[derive(Clone)]
pub struct ScanSession {
    inner: Arc<Mutex<SessionState>>,
    keep_alive: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl ScanSession {
    pub fn new(config: ScanConfig) -> Self {
        let ScanConfig {
            log_level,
            ci,
            keep_alive_interval,
            on_complete,
        } = config;

        let inner = Arc::new(Mutex::new(SessionState {
            log_level,
            ci,
            messages: Vec::new(),
            registry: TaskRegistry::new(),
            bus: EventBus::new(),
            scanned_repositories: 0,
            run: RunState::Running,
            on_complete,
        }));

        let session = Self {
            inner,
            keep_alive: Arc::new(std::sync::Mutex::new(None)),
        };

        if ci {
            let handle = tokio::spawn(keep_alive_loop(
                Arc::downgrade(&session.inner),
                keep_alive_interval,
            ));
            if let Ok(mut slot) = session.keep_alive.lock() {
                *slot = Some(handle);
            }
        }

        session
    }

    // --- subscriptions -----------------------------------------------------

    pub async fn subscribe_messages(
        &self,
        listener: impl FnMut(&LogMessage) + Send + 'static,
    ) -> ListenerId {
        self.inner.lock().await.bus.subscribe_message(listener)
    }

    pub async fn subscribe_tasks(
        &self,
        listener: impl FnMut(&Task, bool) + Send + 'static,
    ) -> ListenerId {
        self.inner.lock().await.bus.subscribe_task(listener)
    }

    pub async fn subscribe_exit(&self, listener: impl FnMut() + Send + 'static) -> ListenerId {
        self.inner.lock().await.bus.subscribe_exit(listener)
    }

    pub async fn subscribe_keep_alive(
        &self,
        listener: impl FnMut(&str) + Send + 'static,
    ) -> ListenerId {
        self.inner.lock().await.bus.subscribe_keep_alive(listener)
    }

    pub async fn unsubscribe(&self, channel: Channel, id: ListenerId) -> bool {
        self.inner.lock().await.bus.unsubscribe(channel, id)
    }

    // --- accessors ---------------------------------------------------------

    /// The stored message stream, filtered by the configured level at read
    /// time.
    pub async fn messages(&self) -> Vec<LogMessage> {
        let state = self.inner.lock().await;
        state
            .messages
            .iter()
            .filter(|message| filter::is_message_visible(message, state.log_level))
            .cloned()
            .collect()
    }

    /// Total number of stored messages, ignoring visibility. The stream only
    /// ever grows for the lifetime of a scan.
    pub async fn message_count(&self) -> usize {
        self.inner.lock().await.messages.len()
    }

    pub async fn scanned_repositories(&self) -> usize {
        self.inner.lock().await.scanned_repositories
    }

    pub async fn task_snapshot(&self) -> Vec<Task> {
        self.inner.lock().await.registry.snapshot()
    }

    pub async fn is_finished(&self) -> bool {
        self.inner.lock().await.run == RunState::Done
    }

    // --- reporting calls ---------------------------------------------------
    //
    // Fire-and-forget: nothing here returns an error to the worker that
    // reported the event.

    pub async fn add_message(&self, message: LogMessage) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("add_message") {
            return;
        }
        state.add_message(message);
    }

    pub async fn on_task_start(&self, repository: &str) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_task_start") {
            return;
        }
        state.update_task(
            repository,
            TaskUpdate::new().step(TaskStep::Start).color(MessageColor::Yellow),
        );
    }

    pub async fn on_repository_clone(&self, repository: &str) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_repository_clone") {
            return;
        }
        state.update_task(
            repository,
            TaskUpdate::new().step(TaskStep::Clone).color(MessageColor::Yellow),
        );
    }

    pub async fn on_repository_pull(&self, repository: &str) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_repository_pull") {
            return;
        }
        state.update_task(
            repository,
            TaskUpdate::new().step(TaskStep::Pull).color(MessageColor::Yellow),
        );
    }

    pub async fn on_repository_read(&self, repository: &str) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_repository_read") {
            return;
        }
        state.update_task(
            repository,
            TaskUpdate::new().step(TaskStep::Read).color(MessageColor::Yellow),
        );
    }

    pub async fn on_lint_start(&self, repository: &str, file_count: usize) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_lint_start") {
            return;
        }
        state.update_task(
            repository,
            TaskUpdate::new()
                .step(TaskStep::Lint)
                .color(MessageColor::Yellow)
                .file_count(file_count)
                .current_file_index(0),
        );
    }

    pub async fn on_file_lint_end(&self, repository: &str, current_file_index: usize) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_file_lint_end") {
            return;
        }
        state.update_task(
            repository,
            TaskUpdate::new()
                .step(TaskStep::Lint)
                .color(MessageColor::Green)
                .current_file_index(current_file_index),
        );
    }

    /// Slow-file warning, reported once per distinct file per repository.
    pub async fn on_file_lint_slow(&self, repository: &str, seconds: f64, file: &str) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_file_lint_slow") {
            return;
        }
        if state.add_task_warning(repository, file) {
            state.add_message(
                LogMessage::warn(templates::lint_slow(seconds, file))
                    .with_color(MessageColor::Yellow),
            );
        }
    }

    /// Linter crash, reported once per distinct rule per repository.
    pub async fn on_linter_crash(&self, repository: &str, rule: &str) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_linter_crash") {
            return;
        }
        if state.add_task_warning(repository, rule) {
            state.add_message(
                LogMessage::error(templates::linter_crash(repository, rule))
                    .with_color(MessageColor::Red),
            );
        }
    }

    /// Worker crash, reported once per repository regardless of error code.
    pub async fn on_worker_crash(&self, repository: &str, error_code: Option<&str>) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_worker_crash") {
            return;
        }
        if state.add_task_warning(repository, WORKER_CRASH_WARNING) {
            state.add_message(
                LogMessage::error(templates::worker_crash(repository, error_code))
                    .with_color(MessageColor::Red),
            );
        }
    }

    pub async fn on_clone_failure(&self, repository: &str) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_clone_failure") {
            return;
        }
        state.add_message(
            LogMessage::error(templates::clone_failure(repository)).with_color(MessageColor::Red),
        );
    }

    pub async fn on_pull_failure(&self, repository: &str) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_pull_failure") {
            return;
        }
        state.add_message(
            LogMessage::error(templates::pull_failure(repository)).with_color(MessageColor::Red),
        );
    }

    pub async fn on_read_failure(&self, repository: &str) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_read_failure") {
            return;
        }
        state.add_message(
            LogMessage::error(templates::read_failure(repository)).with_color(MessageColor::Red),
        );
    }

    pub async fn on_write_failure(&self, repository: &str) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_write_failure") {
            return;
        }
        state.add_message(
            LogMessage::error(templates::write_failure(repository)).with_color(MessageColor::Red),
        );
    }

    /// End of one repository's lint stage: counts the repository as scanned,
    /// appends the per-repository summary, removes the task and delivers it
    /// with `is_final = true`.
    pub async fn on_lint_end(&self, repository: &str, result_count: usize) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_lint_end") {
            return;
        }

        let has_findings = result_count > 0;
        state.scanned_repositories += 1;
        state.add_message(
            LogMessage::new(
                templates::lint_end(repository, result_count),
                if has_findings { LogLevel::Error } else { LogLevel::Verbose },
            )
            .with_color(if has_findings { MessageColor::Red } else { MessageColor::Green }),
        );

        if let Some(task) = state.registry.remove(repository) {
            if filter::is_task_visible(state.ci, state.log_level) {
                state.bus.publish_task(&task, true);
            }
        }
    }

    /// Manual keep-alive emission; the periodic CI task calls the same path.
    pub async fn on_ci_status(&self) {
        let mut state = self.inner.lock().await;
        if !state.reporting_allowed("on_ci_status") {
            return;
        }
        state.publish_ci_status();
    }

    // --- shutdown ----------------------------------------------------------

    /// Finish the scan run. Called exactly once by the embedding caller when
    /// every repository has been scanned; a second call is a logged no-op.
    ///
    /// Appends the scan summary through the normal message path, stops the
    /// keep-alive task, invokes the completion hook with `results` and waits
    /// for it to settle, then notifies exit subscribers exactly once. A hook
    /// that panics or resolves to an error is reported to the diagnostic log
    /// and never blocks the exit notification.
    pub async fn finish(&self, results: ScanResults) {
        let hook = {
            let mut state = self.inner.lock().await;
            if state.run != RunState::Running {
                log::warn!("finish called on an already-finishing scan; ignoring");
                return;
            }
            state.run = RunState::Finalizing;
            let scanned_repositories = state.scanned_repositories;
            state.add_message(
                LogMessage::verbose(templates::scan_finished(scanned_repositories))
                    .with_color(MessageColor::Green),
            );
            state.run = RunState::AwaitingHook;
            state.on_complete.take()
        };

        self.stop_keep_alive();

        if let Some(hook) = hook {
            run_completion_hook(hook, results).await;
        }

        let mut state = self.inner.lock().await;
        state.run = RunState::Notifying;
        state.bus.publish_exit();
        state.run = RunState::Done;
    }

    /// Idempotent: stopping twice, or stopping a never-started timer, is a
    /// no-op.
    fn stop_keep_alive(&self) {
        if let Ok(mut slot) = self.keep_alive.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        // Last handle going away cancels the keep-alive task; the weak
        // upgrade inside the loop covers the case where the task is mid-tick.
        if Arc::strong_count(&self.inner) == 1 {
            self.stop_keep_alive();
        }
    }
}

async fn keep_alive_loop(state: Weak<Mutex<SessionState>>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let Some(state) = state.upgrade() else {
            break;
        };
        let mut state = state.lock().await;
        if state.run != RunState::Running {
            break;
        }
        state.publish_ci_status();
    }
}

/// A synchronous panic, a panicking future and an error resolution are all
/// treated identically: reported to the diagnostic log, never propagated.
async fn run_completion_hook(hook: CompletionHook, results: ScanResults) {
    let future = match catch_unwind(AssertUnwindSafe(|| hook(results))) {
        Ok(future) => future,
        Err(panic) => {
            log::error!("completion hook panicked: {}", panic_message(&*panic));
            return;
        }
    };

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => log::error!("completion hook failed: {error}"),
        Err(panic) => log::error!("completion hook panicked: {}", panic_message(&*panic)),
    }
}
