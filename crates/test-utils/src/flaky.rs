use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

/// A fake eventually-consistent check:
/// - fails the first `failures` calls, then succeeds
/// - records when each call started
/// - optionally takes `work` to complete each call.
///
/// Clones share the same call log.
#[derive(Debug, Clone)]
pub struct FlakyOperation {
    failures: u32,
    work: Duration,
    calls: Arc<Mutex<Vec<Instant>>>,
}

impl FlakyOperation {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            work: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(u32::MAX)
    }

    /// Make every call take `work` before answering.
    pub fn with_work(mut self, work: Duration) -> Self {
        self.work = work;
        self
    }

    /// Succeeds with the 1-based attempt number once enough calls failed.
    pub async fn call(&self) -> Result<u32, String> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            calls.len() as u32
        };

        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }

        if attempt > self.failures {
            Ok(attempt)
        } else {
            Err(format!("attempt {attempt} failed"))
        }
    }

    /// Boolean flavour for `wait_until_true`.
    pub async fn check(&self) -> bool {
        self.call().await.is_ok()
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Time between consecutive call starts.
    pub fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }
}
