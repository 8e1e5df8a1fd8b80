// src/lib.rs

pub mod cli;
pub mod config;
pub mod env;
pub mod errors;
pub mod logging;
pub mod probe;
pub mod process;
pub mod retry;
pub mod types;

use tracing::info;

use crate::cli::{
    CliArgs, Command, DetectArgs, HttpArgs, ProcessArgs, PromArgs, RunArgs, WaitArgs,
};
use crate::config::{ConfigFile, load_or_default};
use crate::env::TestEnv;
use crate::errors::{HarnessError, Result};
use crate::process::Cmd;
use crate::retry::wait_until_success;

/// High-level entry point used by `main.rs`.
///
/// Loads the config (explicit path, `probekit.toml`, or defaults) and
/// dispatches to the subcommand.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;

    match args.command {
        Command::Run(run_args) => run_once(&cfg, run_args).await,
        Command::Wait(wait_args) => wait_for_command(&cfg, wait_args).await,
        Command::Http(http_args) => http_probe(&cfg, http_args).await,
        Command::Prom(prom_args) => prometheus_probe(&cfg, prom_args).await,
        Command::Detect(detect_args) => detect(cfg, detect_args).await,
        Command::FreePort => {
            println!("{}", probe::find_free_port()?);
            Ok(())
        }
    }
}

/// Turn the shared process flags into a [`Cmd`] on top of the configured
/// defaults.
pub fn build_cmd(cfg: &ConfigFile, args: &ProcessArgs) -> Result<Cmd> {
    let (program, rest) = args
        .command
        .split_first()
        .ok_or_else(|| HarnessError::Config("no command given".to_string()))?;

    let mut cmd = Cmd::new(program)
        .args(rest.iter().cloned())
        .with_options(cfg.cmd_options());

    if let Some(timeout) = args.timeout {
        cmd = cmd.timeout(timeout);
    }
    if args.no_timeout {
        cmd = cmd.no_timeout();
    }
    for (name, value) in &args.env {
        cmd = cmd.env(name, value);
    }
    if !args.quiet {
        cmd = cmd.print_output();
    }
    if args.print_command {
        cmd = cmd.print_command();
    }

    Ok(cmd)
}

async fn run_once(cfg: &ConfigFile, args: RunArgs) -> Result<()> {
    build_cmd(cfg, &args.process)?.run().await?;
    Ok(())
}

async fn wait_for_command(cfg: &ConfigFile, args: WaitArgs) -> Result<()> {
    let policy = args.budget.policy(cfg)?;
    let cmd = build_cmd(cfg, &args.process)?;
    info!(command = %cmd, max_wait = ?policy.max_wait(), "waiting for command to succeed");

    let cmd = &cmd;
    wait_until_success(policy, move || cmd.clone().run()).await?;
    Ok(())
}

async fn http_probe(cfg: &ConfigFile, args: HttpArgs) -> Result<()> {
    let policy = args.budget.policy(cfg)?;

    let result = if args.any_status {
        let client = probe::http::client(!args.no_follow)?;
        probe::get(&client, &args.url, policy).await?
    } else {
        let client = probe::http::client(true)?;
        probe::get_200(&client, &args.url, policy).await?
    };

    info!(url = %args.url, status = result.status, "got response");
    println!("{}", result.body);
    Ok(())
}

async fn prometheus_probe(cfg: &ConfigFile, args: PromArgs) -> Result<()> {
    let policy = args.budget.policy(cfg)?;
    let prometheus = probe::Prometheus::new(&args.url)?;

    let data = prometheus.wait_for_data(&args.query, policy).await?;
    println!("{}: {} result(s)", args.query, data.len());
    Ok(())
}

async fn detect(mut cfg: ConfigFile, args: DetectArgs) -> Result<()> {
    if let Some(platform) = args.platform {
        cfg.cluster.platform = platform;
    }

    // Not closed: an exposed route has to outlive this process for the
    // printed addresses to be usable.
    let env = TestEnv::init(&cfg).await?;
    let addrs = env.addrs();
    println!("platform:           {}", env.platform());
    println!("namespace:          {}", env.namespace());
    println!("console:            {}", env.console_addr());
    println!("prometheus:         {}", addrs.prometheus);
    println!("console-api:        {}", addrs.console_api);
    println!("grafana:            {}", addrs.grafana);
    println!("alertmanager:       {}", addrs.alertmanager);
    println!("legacy-monitor-api: {}", addrs.legacy_monitor_api);
    Ok(())
}
