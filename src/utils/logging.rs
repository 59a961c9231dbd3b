//! `env_logger` setup and the `ENABLE_LOGS`-gated macros used by the location loops.
//!
//! A module opts in by declaring `const ENABLE_LOGS: bool` and importing the macros
//! from the crate root (`use crate::{log_debug, log_warn};`). Flipping the constant to
//! `false` silences that module without touching the global filter.

/// Initialise `env_logger` with `default_level` unless `RUST_LOG` says otherwise.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(default_level: log::LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();

    if result.is_ok() {
        log::info!("[STORE] logging initialised at {default_level}");
    }
}

/// Parse a level name from configuration, falling back to `Info`.
pub fn parse_level(value: &str) -> log::LevelFilter {
    value.trim().parse().unwrap_or(log::LevelFilter::Info)
}

/// Conditional debug logging.
/// Each module that uses this macro must define `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Conditional info logging.
/// Each module that uses this macro must define `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Conditional warn logging.
/// Each module that uses this macro must define `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}
