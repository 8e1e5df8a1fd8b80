// src/retry/mod.rs

//! Retry engine.
//!
//! Eventually-consistent checks (a deployment becoming available, a metric
//! showing up after the first scrape, an ingress answering 200) are wrapped
//! in a closure and handed to [`wait_until_success`] or [`wait_until_true`].
//!
//! - [`policy`] holds the retry budget and the named presets.
//! - [`backoff`] is the capped exponential delay sequence.
//! - [`wait`] runs the polling loop.

pub mod backoff;
pub mod policy;
pub mod wait;

pub use backoff::Backoff;
pub use policy::{RetryPolicy, WaitPreset};
pub use wait::{NeverTrue, RetryExhausted, wait_until_success, wait_until_true};
