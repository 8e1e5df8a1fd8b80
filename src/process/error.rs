// src/process/error.rs

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

use crate::process::command::CommandLine;

/// Everything that can go wrong while running an external command.
///
/// All variants carry the full command line so a failure in a test report can
/// be diagnosed without re-running it.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The child could not be launched at all (missing executable,
    /// permission denied, ...).
    #[error("{command}: unable to execute: {source}")]
    StartFailed {
        command: CommandLine,
        #[source]
        source: io::Error,
    },

    #[error("{command}: exited unsuccessfully ({status})")]
    ExitedNonZero {
        command: CommandLine,
        status: ExitStatus,
    },

    /// Killed because it outlived its configured timeout.
    #[error("{command}: timed out after {timeout:?} and was killed")]
    TimedOut {
        command: CommandLine,
        timeout: Duration,
    },

    #[error("{command}: still running {grace:?} after SIGTERM and was killed")]
    IgnoredTermination {
        command: CommandLine,
        grace: Duration,
    },

    #[error("{command}: unable to signal process: {source}")]
    Signal {
        command: CommandLine,
        #[source]
        source: io::Error,
    },

    #[error("{command}: waiting for process failed: {source}")]
    Wait {
        command: CommandLine,
        #[source]
        source: io::Error,
    },

    /// Bug in the calling code: double start, stop before start, double stop.
    #[error("{command}: invalid usage: {reason}")]
    InvalidUsage {
        command: CommandLine,
        reason: &'static str,
    },
}

impl ProcessError {
    pub fn command(&self) -> &CommandLine {
        match self {
            ProcessError::StartFailed { command, .. }
            | ProcessError::ExitedNonZero { command, .. }
            | ProcessError::TimedOut { command, .. }
            | ProcessError::IgnoredTermination { command, .. }
            | ProcessError::Signal { command, .. }
            | ProcessError::Wait { command, .. }
            | ProcessError::InvalidUsage { command, .. } => command,
        }
    }

    /// Raw exit code for `ExitedNonZero`; `None` otherwise or when the child
    /// was terminated by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::ExitedNonZero { status, .. } => status.code(),
            _ => None,
        }
    }

    pub fn is_usage_error(&self) -> bool {
        matches!(self, ProcessError::InvalidUsage { .. })
    }
}
