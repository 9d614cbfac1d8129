//! Logging setup for the CLI.
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - full `tracing-subscriber` filter; wins over everything below
//! - `MIGRATOR_DEBUG=true|1|yes` - log at `debug`
//! - `MIGRATOR_LOG_LEVEL=trace|debug|info|warn|error` - log level (default `warn`)
//! - `MIGRATOR_LOG_FORMAT=compact|pretty|json` - output format (default `compact`)
//!
//! Logs go to stderr so `status --json` output stays parseable.

use std::env;
use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Crates whose events pass the level filter.
const CRATES: [&str; 6] = [
    "migrator",
    "migrator_engine",
    "migrator_cli",
    "migrator_postgres",
    "migrator_mysql",
    "migrator_mssql",
];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line human output.
    Compact,
    /// Multi-line human output.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Check if debug logging is enabled via `MIGRATOR_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("MIGRATOR_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Resolve the level from `MIGRATOR_LOG_LEVEL` and `MIGRATOR_DEBUG`.
pub fn log_level() -> &'static str {
    level_from(env::var("MIGRATOR_LOG_LEVEL").ok().as_deref(), is_debug_enabled())
}

fn level_from(level: Option<&str>, debug: bool) -> &'static str {
    let fallback = if debug { "debug" } else { "warn" };
    match level.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

/// Resolve the format from `MIGRATOR_LOG_FORMAT`.
pub fn log_format() -> LogFormat {
    format_from(env::var("MIGRATOR_LOG_FORMAT").ok().as_deref())
}

fn format_from(value: Option<&str>) -> LogFormat {
    match value.map(str::to_lowercase).as_deref() {
        Some("json") => LogFormat::Json,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::Compact,
    }
}

fn directives(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. Subsequent calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        let filter = env::var("RUST_LOG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .and_then(|v| EnvFilter::try_new(v).ok())
            .unwrap_or_else(|| {
                EnvFilter::try_new(directives(log_level()))
                    .unwrap_or_else(|_| EnvFilter::new("warn"))
            });

        let registry = tracing_subscriber::registry().with(filter);
        let installed = match log_format() {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Pretty => registry
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Compact => registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init(),
        };

        if installed.is_err() {
            tracing::debug!("Global subscriber already installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_level_resolution() {
        assert_eq!(level_from(None, false), "warn");
        assert_eq!(level_from(None, true), "debug");
        assert_eq!(level_from(Some("INFO"), true), "info");
        assert_eq!(level_from(Some("loud"), false), "warn");
    }

    #[test]
    fn test_format_resolution() {
        assert_eq!(format_from(None), LogFormat::Compact);
        assert_eq!(format_from(Some("JSON")), LogFormat::Json);
        assert_eq!(format_from(Some("pretty")), LogFormat::Pretty);
        assert_eq!(format_from(Some("xml")), LogFormat::Compact);
    }

    #[test]
    fn test_directives_cover_driver_crates() {
        let d = directives("info");
        assert!(d.contains("migrator_engine=info"));
        assert!(d.contains("migrator_mssql=info"));
    }
}
