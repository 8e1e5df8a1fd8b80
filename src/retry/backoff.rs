// src/retry/backoff.rs

use std::time::Duration;

/// Exponential delay sequence: `first, 2*first, 4*first, ...`, never above
/// `max`.
///
/// The iterator is infinite; once the cap is reached it keeps yielding `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(first: Duration, max: Duration) -> Self {
        Self {
            next: first.min(max),
            max,
        }
    }

    /// Delay that the next call to [`Iterator::next`] will return.
    pub fn peek(&self) -> Duration {
        self.next
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = current.saturating_mul(2).min(self.max);
        Some(current)
    }
}
