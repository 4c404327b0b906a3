//! Cleanup coordinator.
//!
//! Restores the desktop after a sequence, however it ended: reaps the
//! animation process if one is still attached, thaws the frozen screen and
//! shows the cursor. [`CleanupCoordinator::run`] is idempotent and safe to
//! call when no animation ever ran. Failures are logged, never returned.

pub mod compositor;

pub use compositor::{DisplayControl, WayfireIpc, SHOW_CURSOR_METHOD, UNFREEZE_METHOD};

use crate::supervisor::SignalSource;
use std::time::Duration;

/// How hard to try restoring display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    /// One attempt per command.
    Once,
    /// Retry per [`RetryPolicy`]; used after resume when the compositor may be slow.
    WithRetry,
}

/// Retry schedule for display commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

/// What a cleanup run achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// An attached animation session was terminated during this run.
    pub animation_reaped: bool,
    pub screen_unfrozen: bool,
    pub cursor_shown: bool,
}

impl CleanupReport {
    #[must_use]
    pub const fn display_restored(&self) -> bool {
        self.screen_unfrozen && self.cursor_shown
    }
}

/// Restores input and display state.
pub struct CleanupCoordinator {
    display: Box<dyn DisplayControl>,
    retry: RetryPolicy,
    runs: u32,
}

impl CleanupCoordinator {
    #[must_use]
    pub fn new(display: Box<dyn DisplayControl>, retry: RetryPolicy) -> Self {
        Self {
            display,
            retry,
            runs: 0,
        }
    }

    /// Number of completed runs.
    #[must_use]
    pub const fn runs(&self) -> u32 {
        self.runs
    }

    /// Runs cleanup.
    ///
    /// `session` is terminated and taken, so later runs see `None` and leave
    /// the process alone. Display commands are re-issued on every run; both
    /// are no-ops for a compositor that is already unfrozen with a visible cursor.
    pub async fn run(
        &mut self,
        session: &mut Option<Box<dyn SignalSource>>,
        mode: CleanupMode,
    ) -> CleanupReport {
        tracing::debug!(run = self.runs + 1, ?mode, "running cleanup");
        let mut report = CleanupReport::default();

        if let Some(mut animation) = session.take() {
            tracing::debug!(animation = %animation.handler_name(), "reaping animation");
            animation.terminate().await;
            report.animation_reaped = true;
        }

        report.screen_unfrozen = self.call(UNFREEZE_METHOD, mode).await;
        if report.screen_unfrozen {
            tracing::debug!("screen unfrozen");
        }
        report.cursor_shown = self.call(SHOW_CURSOR_METHOD, mode).await;
        if report.cursor_shown {
            tracing::debug!("cursor restored");
        }

        self.runs += 1;
        report
    }

    async fn call(&self, method: &'static str, mode: CleanupMode) -> bool {
        let attempts = match mode {
            CleanupMode::Once => 1,
            CleanupMode::WithRetry => self.retry.attempts.max(1),
        };

        for attempt in 1..=attempts {
            match self.display.call(method).await {
                Ok(()) => return true,
                Err(e) if attempt < attempts => {
                    tracing::debug!(method, attempt, attempts, error = %e, "display command failed, retrying");
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => {
                    tracing::warn!(method, attempts, error = %e, "display command failed");
                }
            }
        }
        false
    }
}

impl std::fmt::Debug for CleanupCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupCoordinator")
            .field("retry", &self.retry)
            .field("runs", &self.runs)
            .finish_non_exhaustive()
    }
}
