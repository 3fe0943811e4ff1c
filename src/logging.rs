//! Logging infrastructure.
//!
//! The engine emits `tracing` events at its working call sites (each
//! association fetch at `debug`, the merge internals at `trace`). This
//! module wires an optional subscriber, controlled by environment
//! variables:
//!
//! - `LODESTONE_DEBUG=true` - Enable debug logging
//! - `LODESTONE_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `LODESTONE_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! Installing a subscriber requires the `tracing-subscriber` feature;
//! without it, events flow to whatever subscriber the application set up
//! itself.
//!
//! ```rust,no_run
//! use lodestone::logging;
//!
//! // Initialize once at application startup.
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `LODESTONE_DEBUG`.
///
/// Returns `true` if `LODESTONE_DEBUG` is set to "true", "1", or "yes"
/// (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("LODESTONE_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `LODESTONE_LOG_LEVEL`.
///
/// Defaults to "debug" if `LODESTONE_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = || if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("LODESTONE_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback(),
        },
        Err(_) => fallback(),
    }
}

/// Get the configured log format from `LODESTONE_LOG_FORMAT`.
///
/// Defaults to "json" for structured logging.
pub fn get_log_format() -> &'static str {
    env::var("LODESTONE_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize the logging system.
///
/// Call once at application startup; subsequent calls are no-ops. Does
/// nothing unless `LODESTONE_DEBUG` or `LODESTONE_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("LODESTONE_LOG_LEVEL").is_err() {
            // No logging requested, skip initialization
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!("lodestone={level}"))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            match get_log_format() {
                "json" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
                "compact" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
            }

            tracing::info!(
                level = level,
                format = get_log_format(),
                "Lodestone logging initialized"
            );
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        {
            // Subscriber feature not enabled; events go to whatever the
            // application installed.
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_defaults_without_env() {
        // The suite does not set LODESTONE_* vars, so the quiet default
        // applies.
        if env::var("LODESTONE_DEBUG").is_err() && env::var("LODESTONE_LOG_LEVEL").is_err() {
            assert_eq!(get_log_level(), "warn");
            assert!(!is_debug_enabled());
        }
    }

    #[test]
    fn test_format_defaults_to_json() {
        if env::var("LODESTONE_LOG_FORMAT").is_err() {
            assert_eq!(get_log_format(), "json");
        }
    }
}
