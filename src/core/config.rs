//! Per-run configuration for the scan session.
//!
//! Fixed at construction time; a session never changes level or CI mode
//! mid-run.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// How often the CI keep-alive status block is published.
pub const CI_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(270);

/// Domain message verbosity. This is the scan's own level, independent of the
/// diagnostic log configured in [`crate::core::logging`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Verbose,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name, rejecting anything outside the closed set.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        value
            .parse()
            .map_err(|_| ConfigError::UnknownLogLevel(value.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown log level {0:?}, expected one of: verbose, warn, error")]
    UnknownLogLevel(String),
    #[error("keep-alive interval must be non-zero")]
    ZeroKeepAliveInterval,
}

/// Scan results handed to the completion hook. The orchestration core never
/// inspects these; they pass through opaque.
pub type ScanResults = serde_json::Value;

pub type HookFuture =
    Pin<Box<dyn Future<Output = Result<(), Box<dyn Error + Send + Sync>>> + Send>>;

/// Completion hook invoked once during shutdown, always treated as
/// asynchronous: a synchronous hook wraps its result in an immediately-ready
/// future.
pub type CompletionHook = Box<dyn FnOnce(ScanResults) -> HookFuture + Send>;

pub struct ScanConfig {
    pub log_level: LogLevel,
    pub ci: bool,
    pub keep_alive_interval: Duration,
    pub on_complete: Option<CompletionHook>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Verbose,
            ci: false,
            keep_alive_interval: CI_KEEP_ALIVE_INTERVAL,
            on_complete: None,
        }
    }
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("log_level", &self.log_level)
            .field("ci", &self.ci)
            .field("keep_alive_interval", &self.keep_alive_interval)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl ScanConfig {
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.config.log_level = log_level;
        self
    }

    pub fn with_log_level_str(mut self, log_level: &str) -> Result<Self, ConfigError> {
        self.config.log_level = LogLevel::parse(log_level)?;
        Ok(self)
    }

    pub fn with_ci(mut self, ci: bool) -> Self {
        self.config.ci = ci;
        self
    }

    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.config.keep_alive_interval = interval;
        self
    }

    pub fn with_on_complete<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(ScanResults) -> HookFuture + Send + 'static,
    {
        self.config.on_complete = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Result<ScanConfig, ConfigError> {
        if self.config.keep_alive_interval.is_zero() {
            return Err(ConfigError::ZeroKeepAliveInterval);
        }
        Ok(self.config)
    }
}
