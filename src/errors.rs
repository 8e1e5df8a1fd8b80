// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::process::ProcessError;
use crate::retry::RetryExhausted;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("gave up after {attempts} attempt(s) in {elapsed:?}: {last_error}")]
    RetryExhausted {
        attempts: u32,
        elapsed: Duration,
        last_error: String,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url}: wanted {expected}, got {status}: {body}")]
    UnexpectedStatus {
        url: String,
        expected: u16,
        status: u16,
        body: String,
    },

    #[error("query {query:?} failed ({error_type}): {error}")]
    Query {
        query: String,
        error_type: String,
        error: String,
    },

    #[error("query {query:?} returned 0 results")]
    NoData { query: String },

    #[error("alertmanager returned an error ({error_type}): {error}")]
    Alerts { error_type: String, error: String },

    #[error("alert {name:?} is not active")]
    NoAlert { name: String },

    #[error("unexpected {what} shape: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Platform error: {0}")]
    Platform(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HarnessError {
    /// True when the error points at the caller (misused API, bad config)
    /// rather than at the environment.
    pub fn is_usage_error(&self) -> bool {
        match self {
            HarnessError::Config(_) => true,
            HarnessError::Process(e) => e.is_usage_error(),
            _ => false,
        }
    }
}

impl<E: fmt::Display> From<RetryExhausted<E>> for HarnessError {
    fn from(err: RetryExhausted<E>) -> Self {
        HarnessError::RetryExhausted {
            attempts: err.attempts,
            elapsed: err.elapsed,
            last_error: err.last_error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
