//! Poll scheduling: exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Delay schedule for repeated polls of the same resource.
///
/// The first poll is immediate; each later delay doubles from `base_ms` up
/// to `max_ms`, plus up to 10% jitter so concurrent waits drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl PollSchedule {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms: max_ms.max(base_ms),
        }
    }

    /// Delay before poll number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
        let capped = self.base_ms.saturating_mul(factor).min(self.max_ms);

        let jitter = match capped / 10 {
            0 => 0,
            range => rand::thread_rng().gen_range(0..range),
        };
        Duration::from_millis(capped + jitter)
    }
}
