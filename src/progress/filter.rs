//! Visibility predicates gating what reaches subscribers and read-back.
//!
//! Filtering only affects delivery and read-back; the stored message stream
//! is never filtered.

use crate::core::config::LogLevel;
use crate::events::event::LogMessage;

/// Check whether a message is visible under the configured level.
pub fn is_message_visible(message: &LogMessage, configured: LogLevel) -> bool {
    match configured {
        LogLevel::Verbose => true,
        LogLevel::Warn => matches!(message.level, LogLevel::Warn | LogLevel::Error),
        LogLevel::Error => message.level == LogLevel::Error,
    }
}

/// Check whether task updates are delivered to subscribers.
///
/// Outside CI, task progress is rendered live regardless of level. Inside CI,
/// per-file task churn is noise unless verbose was explicitly requested; CI
/// relies on the keep-alive channel instead, which bypasses this filter
/// entirely.
pub fn is_task_visible(ci: bool, configured: LogLevel) -> bool {
    !ci || configured == LogLevel::Verbose
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(level: LogLevel) -> LogMessage {
        LogMessage::new("m", level)
    }

    #[test]
    fn test_verbose_level_shows_everything() {
        for level in [LogLevel::Verbose, LogLevel::Warn, LogLevel::Error] {
            assert!(is_message_visible(&message(level), LogLevel::Verbose));
        }
    }

    #[test]
    fn test_warn_level_hides_verbose_messages() {
        assert!(!is_message_visible(&message(LogLevel::Verbose), LogLevel::Warn));
        assert!(is_message_visible(&message(LogLevel::Warn), LogLevel::Warn));
        assert!(is_message_visible(&message(LogLevel::Error), LogLevel::Warn));
    }

    #[test]
    fn test_error_level_shows_only_errors() {
        assert!(!is_message_visible(&message(LogLevel::Verbose), LogLevel::Error));
        assert!(!is_message_visible(&message(LogLevel::Warn), LogLevel::Error));
        assert!(is_message_visible(&message(LogLevel::Error), LogLevel::Error));
    }

    #[test]
    fn test_task_visibility() {
        assert!(!is_task_visible(true, LogLevel::Warn));
        assert!(is_task_visible(true, LogLevel::Verbose));
        assert!(is_task_visible(false, LogLevel::Error));
        assert!(is_task_visible(false, LogLevel::Verbose));
    }
}
