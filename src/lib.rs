//! Progress and orchestration core for fleet-wide lint scans.
//!
//! Tracks the state of many repositories being scanned concurrently by worker
//! processes: which pipeline stage each repository is in, an append-only
//! stream of level-tagged messages, and typed event channels that renderers
//! subscribe to. Also owns the CI keep-alive heartbeat and the orderly
//! shutdown sequence that runs a completion hook before notifying exit
//! listeners.
//!
//! The entry point is [`progress::ScanSession`], constructed once per scan
//! run from a [`core::config::ScanConfig`].

pub mod core;
pub mod events;
pub mod progress;
pub mod task;
pub mod worker;
