// src/config/validate.rs

use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{
    ConfigFile, ProcessSettings, RawConfigFile, RawProcessSection, RawWaitSection, WaitSettings,
};
use crate::errors::{HarnessError, Result};
use crate::process::{DEFAULT_STOP_GRACE, DEFAULT_TIMEOUT};
use crate::retry::policy::{DEFAULT_FIRST_DELAY, DEFAULT_MAX_DELAY};
use crate::retry::{RetryPolicy, WaitPreset};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = HarnessError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let wait = validate_wait(&raw.wait)?;
        let process = validate_process(&raw.process)?;
        validate_cluster(&raw)?;

        Ok(ConfigFile {
            wait,
            process,
            cluster: raw.cluster,
        })
    }
}

fn duration_field(section: &str, key: &str, value: &Option<String>, default: Duration) -> Result<Duration> {
    match value {
        None => Ok(default),
        Some(s) => parse_duration(s)
            .map_err(|e| HarnessError::Config(format!("[{section}].{key}: {e}"))),
    }
}

fn validate_wait(raw: &RawWaitSection) -> Result<WaitSettings> {
    let first_delay = duration_field("wait", "first_delay", &raw.first_delay, DEFAULT_FIRST_DELAY)?;
    let max_delay = duration_field("wait", "max_delay", &raw.max_delay, DEFAULT_MAX_DELAY)?;

    let policy = |key: &str, value: &Option<String>, preset: WaitPreset| -> Result<RetryPolicy> {
        let max_wait = duration_field("wait", key, value, preset.max_wait())?;
        RetryPolicy::new(max_wait, first_delay, max_delay).map_err(|e| match e {
            HarnessError::Config(msg) => HarnessError::Config(format!("[wait]: {msg}")),
            other => other,
        })
    };

    Ok(WaitSettings {
        short: policy("short", &raw.short, WaitPreset::Short)?,
        medium: policy("medium", &raw.medium, WaitPreset::Medium)?,
        long: policy("long", &raw.long, WaitPreset::Long)?,
        longest: policy("longest", &raw.longest, WaitPreset::Longest)?,
    })
}

fn validate_process(raw: &RawProcessSection) -> Result<ProcessSettings> {
    let default_timeout =
        duration_field("process", "default_timeout", &raw.default_timeout, DEFAULT_TIMEOUT)?;
    if default_timeout.is_zero() {
        return Err(HarnessError::Config(
            "[process].default_timeout must be greater than zero".to_string(),
        ));
    }

    let stop_grace = duration_field("process", "stop_grace", &raw.stop_grace, DEFAULT_STOP_GRACE)?;

    if let Some(key) = raw.env.keys().find(|k| k.is_empty() || k.contains('=')) {
        return Err(HarnessError::Config(format!(
            "[process].env: invalid variable name {key:?}"
        )));
    }

    Ok(ProcessSettings {
        default_timeout,
        stop_grace,
        env: raw.env.clone(),
    })
}

fn validate_cluster(raw: &RawConfigFile) -> Result<()> {
    let cluster = &raw.cluster;

    if cluster.namespace.trim().is_empty() {
        return Err(HarnessError::Config(
            "[cluster].namespace must not be empty".to_string(),
        ));
    }
    if cluster.console_service.trim().is_empty() {
        return Err(HarnessError::Config(
            "[cluster].console_service must not be empty".to_string(),
        ));
    }
    if cluster.node_port == 0 {
        return Err(HarnessError::Config(
            "[cluster].node_port must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(toml_src: &str) -> RawConfigFile {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = ConfigFile::try_from(raw("")).unwrap();
        assert_eq!(cfg.policy(WaitPreset::Long), WaitPreset::Long.policy());
        assert_eq!(cfg.process.default_timeout, DEFAULT_TIMEOUT);
        assert_eq!(cfg.cluster.namespace, "lightbend-test");
        assert_eq!(cfg.cluster.node_port, 30080);
    }

    #[test]
    fn overrides_apply_backoff_bounds_to_every_preset() {
        let cfg = ConfigFile::try_from(raw(
            r#"
[wait]
short = "1s"
first_delay = "50ms"
max_delay = "2s"
"#,
        ))
        .unwrap();

        let short = cfg.policy(WaitPreset::Short);
        assert_eq!(short.max_wait(), Duration::from_secs(1));
        assert_eq!(short.first_delay(), Duration::from_millis(50));
        assert_eq!(cfg.policy(WaitPreset::Longest).max_delay(), Duration::from_secs(2));
    }

    #[test]
    fn bad_duration_names_the_key() {
        let err = ConfigFile::try_from(raw("[process]\ndefault_timeout = \"soon\"\n")).unwrap_err();
        match err {
            HarnessError::Config(msg) => assert!(msg.contains("[process].default_timeout"), "{msg}"),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn inverted_backoff_bounds_are_rejected() {
        let err = ConfigFile::try_from(raw(
            "[wait]\nfirst_delay = \"5s\"\nmax_delay = \"1s\"\n",
        ))
        .unwrap_err();
        assert!(matches!(err, HarnessError::Config(msg) if msg.starts_with("[wait]")));
    }

    #[test]
    fn process_env_flows_into_cmd_options() {
        let cfg = ConfigFile::try_from(raw(
            "[process]\nstop_grace = \"3s\"\n[process.env]\nPATH = \"/opt/tools\"\n",
        ))
        .unwrap();

        let opts = cfg.cmd_options();
        assert_eq!(opts.env.get("PATH").map(String::as_str), Some("/opt/tools"));
        assert_eq!(opts.stop_grace, Duration::from_secs(3));
        assert_eq!(opts.timeout, Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn zero_node_port_is_rejected() {
        let err = ConfigFile::try_from(raw("[cluster]\nnode_port = 0\n")).unwrap_err();
        assert!(matches!(err, HarnessError::Config(msg) if msg.contains("node_port")));
    }
}
