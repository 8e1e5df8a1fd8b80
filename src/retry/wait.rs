// src/retry/wait.rs

//! Poll a fallible check until it succeeds or the retry budget runs out.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::retry::policy::RetryPolicy;

/// The guarded operation never succeeded within the budget.
///
/// Only the failure from the final attempt is kept; earlier ones are
/// superseded by it.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub elapsed: Duration,
    pub last_error: E,
}

impl<E> RetryExhausted<E> {
    pub fn into_last_error(self) -> E {
        self.last_error
    }
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempt(s) in {:?}: {}",
            self.attempts, self.elapsed, self.last_error
        )
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryExhausted<E> {}

/// Last error reported by [`wait_until_true`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeverTrue {
    pub description: Option<String>,
}

impl fmt::Display for NeverTrue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation never returned true")?;
        if let Some(desc) = &self.description {
            write!(f, ": {desc}")?;
        }
        Ok(())
    }
}

impl std::error::Error for NeverTrue {}

/// Call `operation` until it returns `Ok`, sleeping with exponential backoff
/// between failed attempts.
///
/// At least one attempt is always made. An attempt that is in flight when the
/// deadline passes runs to completion; only the next one is suppressed.
pub async fn wait_until_success<F, Fut, T, E>(
    policy: RetryPolicy,
    operation: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    poll(policy, operation).await
}

/// Boolean flavour of [`wait_until_success`].
///
/// `description` ends up in the error when the check never passes.
pub async fn wait_until_true<F, Fut>(
    policy: RetryPolicy,
    description: Option<&str>,
    mut operation: F,
) -> Result<(), RetryExhausted<NeverTrue>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let never_true = NeverTrue {
        description: description.map(str::to_string),
    };

    poll(policy, || {
        let check = operation();
        let never_true = never_true.clone();
        async move {
            if check.await {
                Ok(())
            } else {
                Err(never_true)
            }
        }
    })
    .await
}

async fn poll<F, Fut, T, E>(policy: RetryPolicy, mut operation: F) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let started = Instant::now();
    let deadline = started + policy.max_wait();
    let mut backoff = policy.backoff();
    let mut attempts: u32 = 0;

    loop {
        attempts = attempts.saturating_add(1);

        let last_error = match operation().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!(attempts, "operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if Instant::now() >= deadline {
            let elapsed = started.elapsed();
            warn!(
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %last_error,
                "retry budget exhausted"
            );
            return Err(RetryExhausted {
                attempts,
                elapsed,
                last_error,
            });
        }

        // Never sleep past the deadline; the next attempt is the last one.
        let delay = backoff
            .next()
            .unwrap_or(policy.max_delay())
            .min(deadline.saturating_duration_since(Instant::now()));
        debug!(
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %last_error,
            "attempt failed; retrying"
        );
        sleep(delay).await;
    }
}
