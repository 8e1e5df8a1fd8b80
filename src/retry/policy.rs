// src/retry/policy.rs

//! Retry budgets and the named wait presets used across test suites.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{HarnessError, Result};
use crate::retry::backoff::Backoff;

/// Default delay before the second attempt.
pub const DEFAULT_FIRST_DELAY: Duration = Duration::from_millis(20);

/// Ceiling beyond which the backoff delay stops growing.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// How long, and how patiently, to poll an eventually-consistent check.
///
/// A `max_wait` of zero means "try exactly once".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_wait: Duration,
    first_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Build a policy, rejecting a zero `first_delay` or a `max_delay`
    /// smaller than `first_delay`.
    pub fn new(max_wait: Duration, first_delay: Duration, max_delay: Duration) -> Result<Self> {
        if first_delay.is_zero() {
            return Err(HarnessError::Config(
                "retry first_delay must be greater than zero".to_string(),
            ));
        }
        if max_delay < first_delay {
            return Err(HarnessError::Config(format!(
                "retry max_delay ({max_delay:?}) must be >= first_delay ({first_delay:?})"
            )));
        }

        Ok(Self {
            max_wait,
            first_delay,
            max_delay,
        })
    }

    /// Policy with the given budget and the default backoff bounds.
    pub const fn with_max_wait(max_wait: Duration) -> Self {
        Self {
            max_wait,
            first_delay: DEFAULT_FIRST_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Single attempt, no retries.
    pub const fn once() -> Self {
        Self::with_max_wait(Duration::ZERO)
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn first_delay(&self) -> Duration {
        self.first_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Fresh delay sequence for one retry loop.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.first_delay, self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        WaitPreset::Medium.policy()
    }
}

/// Named retry budgets.
///
/// - `Short`: operations expected to succeed quickly.
/// - `Medium`: things that take a little while to start working.
/// - `Long`: operations that can take a while (deployments, first scrape).
/// - `Longest`: not for committed tests; handy while developing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WaitPreset {
    Short,
    Medium,
    Long,
    Longest,
}

impl WaitPreset {
    /// Built-in budget for this preset.
    pub const fn max_wait(self) -> Duration {
        match self {
            WaitPreset::Short => Duration::from_secs(5),
            WaitPreset::Medium => Duration::from_secs(15),
            WaitPreset::Long => Duration::from_secs(70),
            WaitPreset::Longest => Duration::from_secs(200),
        }
    }

    pub const fn policy(self) -> RetryPolicy {
        RetryPolicy::with_max_wait(self.max_wait())
    }
}

impl FromStr for WaitPreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(WaitPreset::Short),
            "medium" | "med" => Ok(WaitPreset::Medium),
            "long" => Ok(WaitPreset::Long),
            "longest" => Ok(WaitPreset::Longest),
            other => Err(format!(
                "invalid wait preset: {other} (expected short, medium, long or longest)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_first_delay() {
        let err = RetryPolicy::new(Duration::from_secs(1), Duration::ZERO, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, HarnessError::Config(msg) if msg.contains("first_delay")));
    }

    #[test]
    fn rejects_max_delay_below_first_delay() {
        let err = RetryPolicy::new(
            Duration::from_secs(1),
            Duration::from_millis(500),
            Duration::from_millis(100),
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Config(msg) if msg.contains("max_delay")));
    }

    #[test]
    fn zero_max_wait_is_allowed() {
        let policy =
            RetryPolicy::new(Duration::ZERO, Duration::from_millis(1), Duration::from_millis(1))
                .unwrap();
        assert_eq!(policy.max_wait(), Duration::ZERO);
        assert_eq!(RetryPolicy::once().max_wait(), Duration::ZERO);
    }

    #[test]
    fn presets_grow_monotonically() {
        let presets = [
            WaitPreset::Short,
            WaitPreset::Medium,
            WaitPreset::Long,
            WaitPreset::Longest,
        ];
        for pair in presets.windows(2) {
            assert!(pair[0].max_wait() < pair[1].max_wait());
        }
        assert_eq!(WaitPreset::Short.policy().first_delay(), DEFAULT_FIRST_DELAY);
    }

    #[test]
    fn parses_preset_names() {
        assert_eq!("med".parse::<WaitPreset>(), Ok(WaitPreset::Medium));
        assert_eq!(" LONG ".parse::<WaitPreset>(), Ok(WaitPreset::Long));
        assert!("forever".parse::<WaitPreset>().is_err());
    }
}
