//! Exponential delays for redelivery and resubscription.

use std::time::Duration;

/// Doubling delay, capped at `max`, restartable with `reset`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            next: initial.min(max),
        }
    }

    /// Return the current delay and double it for next time.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.checked_mul(2).unwrap_or(self.max).min(self.max);
        delay
    }

    /// Start again from the initial delay.
    pub fn reset(&mut self) {
        self.next = self.initial.min(self.max);
    }
}

/// Delay before redelivering a message that failed on its `attempt`-th delivery.
pub fn redelivery_delay(attempt: u32, initial: Duration, max: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    initial.checked_mul(factor).unwrap_or(max).min(max)
}
