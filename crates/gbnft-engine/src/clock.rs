//! Time source injected into the engines so retransmission scheduling can
//! be tested without real time.

use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Remaining time until `deadline`, or zero if it already elapsed.
///
/// This is the single timestamp comparison the sender makes per wait
/// cycle: the wait is always bounded by the oldest in-flight deadline and
/// shrinks as time passes.
pub fn time_until(now: Instant, deadline: Instant) -> Duration {
    deadline.saturating_duration_since(now)
}
