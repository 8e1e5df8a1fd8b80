// src/logging.rs

//! Logging setup for `probekit` using `tracing` + `tracing-subscriber`.
//!
//! Where the filter comes from, first match wins:
//! 1. `--log-level` CLI flag
//! 2. `PROBEKIT_LOG`: either a bare level ("debug") or full filter
//!    directives ("probekit=trace,reqwest=debug")
//! 3. `info`
//!
//! A bare level keeps the HTTP stack at `warn`; at `debug` hyper and rustls
//! would otherwise bury the harness's own retry and process logs.
//!
//! Logs are sent to STDERR so that mirrored command stdout stays clean.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Targets capped at `warn` unless named explicitly in `PROBEKIT_LOG`.
const NOISY_TARGETS: &[&str] = &["hyper", "hyper_util", "h2", "reqwest", "rustls"];

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var("PROBEKIT_LOG").ok();
    let directives = filter_directives(cli_level, env_value.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter {directives:?}"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

/// `level` for everything, with the HTTP client stack held at `warn`.
pub fn default_directives(level: LogLevel) -> String {
    let mut directives = level_name(level).to_string();
    for target in NOISY_TARGETS {
        directives.push_str(&format!(",{target}=warn"));
    }
    directives
}

fn filter_directives(cli_level: Option<LogLevel>, env_value: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return default_directives(level);
    }
    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => match parse_level_str(value) {
            Some(level) => default_directives(level),
            None => value.to_string(),
        },
        None => default_directives(LogLevel::Info),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn parse_level_str(s: &str) -> Option<LogLevel> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(LogLevel::Error),
        "warn" | "warning" => Some(LogLevel::Warn),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" => Some(LogLevel::Trace),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_names_case_insensitively() {
        assert!(matches!(parse_level_str(" Debug "), Some(LogLevel::Debug)));
        assert!(matches!(parse_level_str("warning"), Some(LogLevel::Warn)));
        assert!(parse_level_str("loud").is_none());
    }

    #[test]
    fn http_stack_is_held_at_warn_by_default() {
        assert_eq!(
            default_directives(LogLevel::Debug),
            "debug,hyper=warn,hyper_util=warn,h2=warn,reqwest=warn,rustls=warn"
        );
        assert!(EnvFilter::try_new(default_directives(LogLevel::Trace)).is_ok());
    }

    #[test]
    fn cli_flag_wins_over_environment() {
        let directives = filter_directives(Some(LogLevel::Error), Some("trace"));
        assert!(directives.starts_with("error,"), "{directives}");
    }

    #[test]
    fn environment_accepts_levels_or_raw_directives() {
        assert!(filter_directives(None, Some("DEBUG")).starts_with("debug,hyper=warn"));
        assert_eq!(
            filter_directives(None, Some(" probekit=trace,reqwest=debug ")),
            "probekit=trace,reqwest=debug"
        );
        assert!(filter_directives(None, Some("  ")).starts_with("info,"));
        assert!(filter_directives(None, None).starts_with("info,"));
    }
}
