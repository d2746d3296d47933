//! Progress tracking and reporting for a scan run

pub mod filter;
pub mod session;
pub mod templates;

pub use session::ScanSession;
