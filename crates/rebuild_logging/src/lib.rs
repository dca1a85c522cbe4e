#![deny(missing_docs)]
//! Shared logging utilities for the rebuild workspace.
//!
//! This crate provides the `rebuild_*` logging macros used by the core, the
//! engine and the CLI, a helper for keeping session tokens out of log files,
//! and a minimal test initializer for the global logger.

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! rebuild_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! rebuild_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! rebuild_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! rebuild_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! rebuild_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Renders a session token for log output without revealing it.
///
/// Only the length survives, so two log lines can still be told apart when
/// the token was rotated between runs.
pub fn redact(token: &str) -> String {
    if token.is_empty() {
        "<empty>".to_string()
    } else {
        format!("<redacted:{}>", token.chars().count())
    }
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test may have won the race to install the logger.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Never,
    )]);
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn redact_hides_token_but_keeps_length() {
        assert_eq!(redact("abc123"), "<redacted:6>");
        assert_eq!(redact(""), "<empty>");
    }
}
