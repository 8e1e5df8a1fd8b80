// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{ConfigFile, parse_duration};
use crate::errors::Result;
use crate::retry::{RetryPolicy, WaitPreset};
use crate::types::PlatformSetting;

/// Command-line arguments for `probekit`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "probekit",
    version,
    about = "Retry, process and probe helpers for end-to-end cluster tests.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `probekit.toml` in the current working directory if it
    /// exists, built-in defaults otherwise.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROBEKIT_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a command once, mirroring its output.
    Run(RunArgs),
    /// Re-run a command until it exits successfully or the wait budget runs out.
    Wait(WaitArgs),
    /// GET a URL until it answers 200.
    Http(HttpArgs),
    /// Poll a Prometheus instant query until it returns data.
    Prom(PromArgs),
    /// Detect the cluster platform and print the derived service addresses.
    Detect(DetectArgs),
    /// Print a TCP port that is currently free on localhost.
    FreePort,
}

/// Options shared by every subcommand that spawns a process.
#[derive(Debug, Clone, Args)]
pub struct ProcessArgs {
    /// Kill the command if it runs longer than this (e.g. "30s").
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Let the command run for as long as it likes.
    #[arg(long, conflicts_with = "timeout")]
    pub no_timeout: bool,

    /// Extra environment variable; may be repeated.
    #[arg(long = "env", value_name = "NAME=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Do not mirror the command's output.
    #[arg(long, short)]
    pub quiet: bool,

    /// Log the command line before running it.
    #[arg(long)]
    pub print_command: bool,

    /// The command and its arguments, usually after `--`.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

/// How long to keep retrying.
#[derive(Debug, Clone, Args)]
pub struct WaitBudget {
    /// Named wait budget.
    #[arg(long, value_enum, value_name = "PRESET", default_value_t = WaitPreset::Medium)]
    pub wait: WaitPreset,

    /// Explicit wait budget (e.g. "45s"); overrides `--wait`.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub max_wait: Option<Duration>,
}

impl WaitBudget {
    /// Resolve against the configured presets. An explicit `--max-wait`
    /// keeps the preset's backoff bounds.
    pub fn policy(&self, cfg: &ConfigFile) -> Result<RetryPolicy> {
        let preset = cfg.policy(self.wait);
        match self.max_wait {
            Some(max_wait) => RetryPolicy::new(max_wait, preset.first_delay(), preset.max_delay()),
            None => Ok(preset),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub process: ProcessArgs,
}

#[derive(Debug, Clone, Args)]
pub struct WaitArgs {
    #[command(flatten)]
    pub budget: WaitBudget,

    #[command(flatten)]
    pub process: ProcessArgs,
}

#[derive(Debug, Clone, Args)]
pub struct HttpArgs {
    pub url: String,

    #[command(flatten)]
    pub budget: WaitBudget,

    /// Accept any status code instead of requiring 200.
    #[arg(long)]
    pub any_status: bool,

    /// Do not follow redirects (only with `--any-status`).
    #[arg(long, requires = "any_status")]
    pub no_follow: bool,
}

#[derive(Debug, Clone, Args)]
pub struct PromArgs {
    /// Base URL of the Prometheus server.
    pub url: String,

    /// PromQL expression.
    pub query: String,

    #[command(flatten)]
    pub budget: WaitBudget,
}

#[derive(Debug, Clone, Args)]
pub struct DetectArgs {
    /// Skip detection and assume this platform.
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<PlatformSetting>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_env_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got {s:?}")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn run_collects_trailing_command() {
        let args = parse_from(&[
            "probekit", "run", "--timeout", "2s", "--env", "A=1", "--", "sh", "-c", "exit 3",
        ]);
        let Command::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.process.timeout, Some(Duration::from_secs(2)));
        assert_eq!(run.process.env, vec![("A".to_string(), "1".to_string())]);
        assert_eq!(run.process.command, ["sh", "-c", "exit 3"]);
    }

    #[test]
    fn timeout_and_no_timeout_conflict() {
        let err = CliArgs::try_parse_from(["probekit", "run", "--timeout", "1s", "--no-timeout", "true"]);
        assert!(err.is_err());
    }

    #[test]
    fn env_pairs_need_a_name() {
        assert!(parse_env_pair("=x").is_err());
        assert!(parse_env_pair("novalue").is_err());
        assert_eq!(parse_env_pair("K=a=b").unwrap(), ("K".into(), "a=b".into()));
    }

    #[test]
    fn max_wait_overrides_preset_but_keeps_backoff() {
        let args = parse_from(&["probekit", "http", "http://x", "--wait", "long", "--max-wait", "3s"]);
        let Command::Http(http) = args.command else {
            panic!("expected http");
        };
        let cfg = ConfigFile::default();
        let policy = http.budget.policy(&cfg).unwrap();
        assert_eq!(policy.max_wait(), Duration::from_secs(3));
        assert_eq!(policy.first_delay(), cfg.policy(WaitPreset::Long).first_delay());
    }

    #[test]
    fn print_command_and_quiet_reach_the_built_command() {
        let args = parse_from(&["probekit", "run", "--print-command", "--quiet", "--", "echo", "hi"]);
        let Command::Run(run) = args.command else {
            panic!("expected run");
        };
        let cmd = crate::build_cmd(&ConfigFile::default(), &run.process).unwrap();
        assert!(cmd.options().print_command);
        assert_eq!(cmd.command_line().to_string(), "echo hi");
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let args = parse_from(&["probekit", "free-port", "--log-level", "debug"]);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(matches!(args.command, Command::FreePort));
    }
}
