//! The action sequencer state machine.
//!
//! | Phase | Trigger | Next |
//! |---|---|---|
//! | Idle | no animation | ActionInFlight (test mode: Cleanup) |
//! | Idle | named animation | Launching |
//! | Launching | launch failure | ActionInFlight, degraded |
//! | Launching | launched | AwaitingCover |
//! | AwaitingCover | `COVERED` | ActionInFlight (test mode: hold, then Cleanup) |
//! | AwaitingCover | timeout or exit | ActionInFlight, degraded, animation terminated |
//! | ActionInFlight | suspend/hibernate acknowledged | SuspendedAwaitingResume |
//! | ActionInFlight | other action acknowledged | AwaitingFinish |
//! | ActionInFlight | invocation failed | Cleanup → Terminal(Failed) |
//! | SuspendedAwaitingResume | resume observed | AwaitingFinish |
//! | AwaitingFinish | `FINISHED` or timeout | Cleanup |
//! | Cleanup | done | Terminal |
//!
//! Handler faults degrade to instant mode for real actions and fail the
//! sequence in test mode. An interrupt before the power action is requested
//! routes straight to Cleanup and fails the sequence. Once the action has been
//! acknowledged the remaining waits run to their own timeouts; a late interrupt
//! is only recorded. Every path ends with a [`CleanupCoordinator`] run.

use crate::cleanup::{CleanupCoordinator, CleanupMode, CleanupReport};
use crate::domain::{
    AnimationMode, PowerActionKind, PowerActionRequest, PowerManagerError, Result, SequencePhase,
    Terminal,
};
use crate::power::PowerInvoker;
use crate::registry::HandlerRegistry;
use crate::supervisor::{CoverOutcome, FinishOutcome, Launcher, SignalSource};
use super::wake::WakeSource;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Timing and defaults for one sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerSettings {
    /// Animation used when the invocation names none.
    pub default_animation: String,
    /// Longest wait for `COVERED` before degrading.
    pub cover_timeout: Duration,
    /// Longest wait for `FINISHED` after a non-suspend action.
    pub finish_timeout: Duration,
    /// Longest wait for the wake source after suspend is acknowledged.
    pub resume_timeout: Duration,
    /// Pause after resume before restoring the display.
    pub resume_settle: Duration,
    /// How long test mode keeps a covered animation on screen.
    pub hold: Duration,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            default_animation: "fire".to_string(),
            cover_timeout: Duration::from_secs(5),
            finish_timeout: Duration::from_secs(30),
            resume_timeout: Duration::from_secs(120),
            resume_settle: Duration::from_secs(3),
            hold: Duration::from_secs(3),
        }
    }
}

/// Result of one sequence.
#[derive(Debug)]
pub struct SequenceReport {
    /// `Ok` for `Terminal(Success)`, otherwise the failure reason.
    pub outcome: Result<()>,
    /// Every phase entered, starting with `Idle` and ending with a terminal phase.
    pub history: Vec<SequencePhase>,
    /// Non-fatal faults the sequence worked around, including an interrupt
    /// that arrived after the power action.
    pub degradations: Vec<PowerManagerError>,
    /// What the final cleanup run restored.
    pub cleanup: CleanupReport,
}

impl SequenceReport {
    /// The terminal phase the sequence ended in.
    #[must_use]
    pub fn terminal(&self) -> Terminal {
        match &self.outcome {
            Ok(()) => Terminal::Success,
            Err(_) => Terminal::Failed,
        }
    }

    /// Whether the sequence ended in `Terminal(Success)`, degraded or not.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The failure reason, if the sequence failed.
    #[must_use]
    pub fn error(&self) -> Option<&PowerManagerError> {
        match &self.outcome {
            Ok(()) => None,
            Err(e) => Some(e),
        }
    }

    /// Whether the sequence entered `phase` at any point.
    #[must_use]
    pub fn visited(&self, phase: SequencePhase) -> bool {
        self.history.contains(&phase)
    }
}

/// Orchestrates one animated power action.
///
/// A sequencer runs once: [`run`](Self::run) consumes it, so an invocation can
/// never own more than one animation session.
pub struct ActionSequencer {
    registry: HandlerRegistry,
    launcher: Box<dyn Launcher>,
    invoker: Box<dyn PowerInvoker>,
    wake: Box<dyn WakeSource>,
    cleanup: CleanupCoordinator,
    settings: SequencerSettings,
    phase: SequencePhase,
    history: Vec<SequencePhase>,
    session: Option<Box<dyn SignalSource>>,
    degradations: Vec<PowerManagerError>,
    resumed: bool,
}

impl ActionSequencer {
    /// Creates a sequencer in `Idle`.
    ///
    /// # Parameters
    ///
    /// * `registry` - Animations that may be launched
    /// * `launcher` - Starts the animation process
    /// * `invoker` - Performs the OS power action
    /// * `wake` - Reports resume after suspend or hibernate
    /// * `cleanup` - Restores the display at the end of every sequence
    /// * `settings` - Timeouts, hold period and the default animation
    #[must_use]
    pub fn new(
        registry: HandlerRegistry,
        launcher: Box<dyn Launcher>,
        invoker: Box<dyn PowerInvoker>,
        wake: Box<dyn WakeSource>,
        cleanup: CleanupCoordinator,
        settings: SequencerSettings,
    ) -> Self {
        Self {
            registry,
            launcher,
            invoker,
            wake,
            cleanup,
            settings,
            phase: SequencePhase::Idle,
            history: vec![SequencePhase::Idle],
            session: None,
            degradations: Vec::new(),
            resumed: false,
        }
    }

    /// Builds a request, falling back to the configured default animation.
    #[must_use]
    pub fn request(
        &self,
        kind: PowerActionKind,
        animation: Option<&str>,
        test_only: bool,
    ) -> PowerActionRequest {
        let animation =
            AnimationMode::from_name(animation.unwrap_or(self.settings.default_animation.as_str()));
        PowerActionRequest {
            kind,
            animation,
            test_only,
        }
    }

    /// Runs the sequence to a terminal phase.
    ///
    /// Cancelling `interrupt` before the power action is requested skips to
    /// cleanup and fails the sequence with [`PowerManagerError::Interrupted`].
    /// After the action is acknowledged there is no cancellation: the finish or
    /// resume wait runs to its timeout, and the interrupt is recorded as a
    /// degradation.
    pub async fn run(
        mut self,
        request: PowerActionRequest,
        interrupt: CancellationToken,
    ) -> SequenceReport {
        let span = tracing::info_span!(
            "sequence",
            action = %request.kind,
            animation = %request.animation,
            test_only = request.test_only
        );

        async move {
            tracing::info!("sequence started");
            let outcome = self.drive(&request, &interrupt).await;

            self.advance(SequencePhase::Cleanup);
            let mode = if self.resumed {
                CleanupMode::WithRetry
            } else {
                CleanupMode::Once
            };
            let cleanup = self.cleanup.run(&mut self.session, mode).await;

            let terminal = match &outcome {
                Ok(()) => {
                    tracing::info!(degraded = !self.degradations.is_empty(), "sequence complete");
                    Terminal::Success
                }
                Err(e) => {
                    tracing::error!(error = %e, "sequence failed");
                    Terminal::Failed
                }
            };
            self.advance(SequencePhase::Terminal(terminal));

            SequenceReport {
                outcome,
                history: self.history,
                degradations: self.degradations,
                cleanup,
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &mut self,
        request: &PowerActionRequest,
        interrupt: &CancellationToken,
    ) -> Result<()> {
        if let AnimationMode::Named(name) = &request.animation {
            self.cover(name, request, interrupt).await?;
        }

        if request.test_only {
            if self.session.is_some() {
                self.hold(interrupt).await?;
            }
            return Ok(());
        }

        if interrupt.is_cancelled() {
            return Err(PowerManagerError::Interrupted);
        }

        self.advance(SequencePhase::ActionInFlight);
        let watcher: Option<JoinHandle<()>> = request
            .kind
            .resumes()
            .then(|| tokio::spawn(self.wake.watch()));

        if let Err(e) = self.invoker.invoke(request.kind).await {
            if let Some(watcher) = watcher {
                watcher.abort();
            }
            return Err(e);
        }
        tracing::info!(action = %request.kind, "power action acknowledged");

        if let Some(watcher) = watcher {
            self.advance(SequencePhase::SuspendedAwaitingResume);
            self.await_resume(watcher).await;
            if self.session.is_some() {
                // The finish timeout does not apply after resume; cleanup reaps the animation.
                self.advance(SequencePhase::AwaitingFinish);
            }
        } else if self.session.is_some() {
            self.advance(SequencePhase::AwaitingFinish);
            self.await_finish().await;
        }

        if interrupt.is_cancelled() {
            tracing::warn!("interrupt received after the power action, ignored");
            self.degradations.push(PowerManagerError::Interrupted);
        }
        Ok(())
    }

    /// Launches the animation and waits for it to cover the screen.
    ///
    /// Returns `Ok` when covered or degraded to instant mode.
    async fn cover(
        &mut self,
        name: &str,
        request: &PowerActionRequest,
        interrupt: &CancellationToken,
    ) -> Result<()> {
        let handler = match self.registry.resolve(name) {
            Ok(handler) => handler.clone(),
            Err(e) => return self.degrade(request, e),
        };

        self.advance(SequencePhase::Launching);
        let mut session = match self.launcher.launch(&handler, request) {
            Ok(session) => session,
            Err(e) => return self.degrade(request, e),
        };

        self.advance(SequencePhase::AwaitingCover);
        let timeout = self.settings.cover_timeout;
        let outcome = tokio::select! {
            biased;
            () = interrupt.cancelled() => None,
            outcome = session.await_cover(timeout) => Some(outcome),
        };

        match outcome {
            None => {
                self.session = Some(session);
                Err(PowerManagerError::Interrupted)
            }
            Some(CoverOutcome::Covered) => {
                tracing::info!(animation = %handler.name, "screen covered");
                self.session = Some(session);
                Ok(())
            }
            Some(fault) => {
                session.terminate().await;
                let err = if fault == CoverOutcome::TimedOut {
                    PowerManagerError::CoverTimeout { timeout }
                } else {
                    PowerManagerError::CoverLost
                };
                self.degrade(request, err)
            }
        }
    }

    /// Records a handler fault; fatal only when previewing.
    fn degrade(&mut self, request: &PowerActionRequest, err: PowerManagerError) -> Result<()> {
        if request.test_only {
            return Err(err);
        }
        tracing::warn!(error = %err, "continuing without animation");
        self.degradations.push(err);
        Ok(())
    }

    async fn hold(&mut self, interrupt: &CancellationToken) -> Result<()> {
        tracing::info!(hold_ms = self.settings.hold.as_millis(), "holding preview");
        tokio::select! {
            () = interrupt.cancelled() => Err(PowerManagerError::Interrupted),
            () = tokio::time::sleep(self.settings.hold) => Ok(()),
        }
    }

    async fn await_resume(&mut self, mut watcher: JoinHandle<()>) {
        let resume_timeout = self.settings.resume_timeout;
        let resumed = tokio::time::timeout(resume_timeout, &mut watcher).await;
        watcher.abort();
        self.resumed = true;

        match resumed {
            Ok(Ok(())) => tracing::info!("system resumed"),
            Ok(Err(e)) => tracing::warn!(error = %e, "resume watcher failed"),
            Err(_) => tracing::warn!(
                timeout_ms = resume_timeout.as_millis(),
                "no resume observed, continuing"
            ),
        }

        tokio::time::sleep(self.settings.resume_settle).await;
    }

    async fn await_finish(&mut self) {
        let timeout = self.settings.finish_timeout;
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.await_finish(timeout).await {
            FinishOutcome::Finished => tracing::debug!("animation finished"),
            FinishOutcome::ProcessExited => tracing::debug!("animation exited"),
            FinishOutcome::TimedOut => {
                let err = PowerManagerError::FinishTimeout { timeout };
                tracing::warn!(error = %err, "terminating animation");
                self.degradations.push(err);
            }
        }
    }

    fn advance(&mut self, next: SequencePhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.phase
        );
        tracing::debug!(from = %self.phase, to = %next, "phase transition");
        self.phase = next;
        self.history.push(next);
    }
}

impl std::fmt::Debug for ActionSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSequencer")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .field("phase", &self.phase)
            .field("cleanup", &self.cleanup)
            .finish_non_exhaustive()
    }
}
