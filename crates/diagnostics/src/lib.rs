// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Lightweight structured logging shared by the pachfs crates.
//!
//! Usage:
//! - `PACHFS_LOG=off` (default) - no logs
//! - `PACHFS_LOG=info` - remote writes, deletes, opened handles
//! - `PACHFS_LOG=debug` - every lookup issued against the remote client
//!
//! Events are written to stderr through `emit_term`.

use std::sync::Once;

// Re-export emit so the macros below resolve from any crate
pub use emit;

/// Environment variable consulted by [`init_diagnostics`].
pub const LOG_ENV: &str = "PACHFS_LOG";

static INIT: Once = Once::new();

/// Map a `PACHFS_LOG` value to a minimum level. `None` means logging is off.
///
/// Unknown values fall back to `Info` so a typo never silences warnings.
#[must_use]
pub fn level_from_str(value: &str) -> Option<emit::Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" | "none" => None,
        "error" => Some(emit::Level::Error),
        "warn" | "warning" => Some(emit::Level::Warn),
        "debug" | "trace" => Some(emit::Level::Debug),
        _ => Some(emit::Level::Info),
    }
}

/// Initialize diagnostics from the `PACHFS_LOG` environment variable.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let value = std::env::var(LOG_ENV).unwrap_or_default();
        let Some(level) = level_from_str(&value) else {
            return;
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        // The runtime lives for the rest of the process
        std::mem::forget(rt);
    });
}

/// Log operations a user may want to see (remote commits, opened handles).
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (individual lookups, listing sizes).
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable problems, e.g. a write handle dropped without close.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures that abort an operation.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_safe_to_call_multiple_times() {
        init_diagnostics();
        init_diagnostics();
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!(level_from_str("off"), None);
        assert_eq!(level_from_str(""), None);
        assert_eq!(level_from_str("debug"), Some(emit::Level::Debug));
        assert_eq!(level_from_str("WARN"), Some(emit::Level::Warn));
        assert_eq!(level_from_str("error"), Some(emit::Level::Error));
        assert_eq!(level_from_str("verbose"), Some(emit::Level::Info));
    }

    #[test]
    fn test_macros_compile() {
        info!("Test message");
        debug!("Listed {count} entries", count: 3);
        warn!("Warning for {path}", path: "/videos");
        error!("Error message");
        log_info!("Test message");
        log_debug!("Debug message with {value}", value: 42);
    }
}
