//! Resume detection.
//!
//! The sequencer does not know how the platform reports a wake-up; it arms a
//! [`WakeSource`] just before requesting suspend and waits for the returned
//! future. [`ClockJumpWake`] detects resume by comparing the monotonic clock,
//! which stops while the machine sleeps, with the wall clock, which does not.

use futures_util::future::BoxFuture;
use std::time::{Duration, Instant, SystemTime};

/// Observes the system waking up from suspend or hibernate.
pub trait WakeSource: Send + Sync {
    /// Starts watching. The returned future completes after the next resume.
    ///
    /// The future is spawned before the power action is invoked, so a sleep
    /// that begins before the invoker returns is still observed.
    fn watch(&self) -> BoxFuture<'static, ()>;
}

/// Detects resume from a wall-clock jump that the monotonic clock did not see.
#[derive(Debug, Clone, Copy)]
pub struct ClockJumpWake {
    poll_interval: Duration,
    jump_threshold: Duration,
}

impl ClockJumpWake {
    #[must_use]
    pub const fn new(poll_interval: Duration, jump_threshold: Duration) -> Self {
        Self {
            poll_interval,
            jump_threshold,
        }
    }
}

impl Default for ClockJumpWake {
    fn default() -> Self {
        Self::new(Duration::from_millis(250), Duration::from_secs(2))
    }
}

impl WakeSource for ClockJumpWake {
    fn watch(&self) -> BoxFuture<'static, ()> {
        let Self {
            poll_interval,
            jump_threshold,
        } = *self;

        Box::pin(async move {
            loop {
                let mono_start = Instant::now();
                let wall_start = SystemTime::now();
                tokio::time::sleep(poll_interval).await;

                let mono = mono_start.elapsed();
                let wall = wall_start.elapsed().unwrap_or_default();
                if let Some(slept) = suspended_for(mono, wall, jump_threshold) {
                    tracing::info!(slept_ms = slept.as_millis(), "resume detected");
                    return;
                }
            }
        })
    }
}

/// Time spent asleep during an interval, if the clocks disagree by more than `threshold`.
fn suspended_for(mono: Duration, wall: Duration, threshold: Duration) -> Option<Duration> {
    let gap = wall.checked_sub(mono)?;
    (gap > threshold).then_some(gap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_drift_is_not_a_resume() {
        assert_eq!(
            suspended_for(Duration::from_millis(250), Duration::from_millis(260), Duration::from_secs(2)),
            None
        );
    }

    #[test]
    fn wall_clock_jump_is_a_resume() {
        assert_eq!(
            suspended_for(Duration::from_millis(250), Duration::from_secs(30), Duration::from_secs(2)),
            Some(Duration::from_millis(29_750))
        );
    }

    #[test]
    fn wall_clock_going_backwards_is_ignored() {
        assert_eq!(
            suspended_for(Duration::from_secs(1), Duration::ZERO, Duration::from_secs(2)),
            None
        );
    }
}
