#![deny(missing_docs)]
//! Shared logging utilities for the circular chat workspace.
//!
//! This crate provides the `chat_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger.
//!
//! Every macro accepts an optional `job: <id>;` prefix which tags the line
//! with the remote job it concerns:
//!
//! ```
//! use circular_logging::chat_info;
//!
//! chat_info!("plain line {}", 1);
//! chat_info!(job: "abc"; "status changed to {}", "PROCESSING");
//! ```

#[doc(hidden)]
pub use log as __log;

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! chat_trace {
    (job: $job:expr; $($arg:tt)*) => {{
        $crate::__log::trace!("[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! chat_debug {
    (job: $job:expr; $($arg:tt)*) => {{
        $crate::__log::debug!("[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! chat_info {
    (job: $job:expr; $($arg:tt)*) => {{
        $crate::__log::info!("[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! chat_warn {
    (job: $job:expr; $($arg:tt)*) => {{
        $crate::__log::warn!("[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! chat_error {
    (job: $job:expr; $($arg:tt)*) => {{
        $crate::__log::error!("[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized, so
/// every test may call it unconditionally.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Debug builds get the polling chatter too.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
