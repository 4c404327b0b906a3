//! Child-process animation sessions.
//!
//! [`ProcessLauncher`] spawns a handler with tokio, pipes its stdout into the
//! [`signal`](crate::signal) channel and wraps the child in an
//! [`AnimationSession`]. The child is spawned with `kill_on_drop`, so a session
//! dropped mid-sequence (for example when the orchestrator unwinds) still
//! takes its process down.

use super::source::{CoverOutcome, FinishOutcome, Launcher, SignalSource};
use crate::domain::{HandlerDescriptor, PowerActionRequest, PowerManagerError, Result};
use crate::infrastructure::ANIMATIONS_DIR_ENV;
use crate::signal::{self, Marker, Received, SignalEvent, SignalReceiver};
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Environment variable telling the handler which action it is covering.
pub const ACTION_ENV: &str = "POWER_MANAGER_ACTION";

/// Lifecycle of one animation process as seen by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Running,
    Covered,
    Finished,
    /// The process closed its output on its own.
    Exited,
    /// The supervisor stopped and reaped the process.
    Terminated,
}

/// Spawns handlers as child processes.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    animations_root: Option<PathBuf>,
    terminate_grace: Duration,
}

impl ProcessLauncher {
    /// Creates a launcher.
    ///
    /// * `animations_root` - Passed to handlers as `SHUTDOWN_EFFECTS_DIR`
    /// * `terminate_grace` - Time between SIGTERM and SIGKILL
    #[must_use]
    pub const fn new(animations_root: Option<PathBuf>, terminate_grace: Duration) -> Self {
        Self {
            animations_root,
            terminate_grace,
        }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(
        &self,
        handler: &HandlerDescriptor,
        request: &PowerActionRequest,
    ) -> Result<Box<dyn SignalSource>> {
        let launch_error = |reason: String| PowerManagerError::Launch {
            name: handler.name.clone(),
            reason,
        };

        let program = handler
            .program()
            .ok_or_else(|| launch_error("handler has an empty command".to_string()))?;

        let action = if request.test_only {
            "test"
        } else {
            request.kind.as_str()
        };

        let mut command = Command::new(program);
        command
            .args(handler.args())
            .current_dir(&handler.animation_dir)
            .env(ACTION_ENV, action)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(root) = &self.animations_root {
            command.env(ANIMATIONS_DIR_ENV, root);
        }

        let mut child = command.spawn().map_err(|e| launch_error(e.to_string()))?;
        tracing::info!(
            animation = %handler.name,
            pid = ?child.id(),
            command = ?handler.command,
            "animation started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| launch_error("failed to capture stdout".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(handler.name.clone(), stderr));
        }

        let (sender, signals) = signal::channel();
        let reader = tokio::spawn(signal::pump_lines(BufReader::new(stdout), sender));

        Ok(Box::new(AnimationSession {
            handler: handler.clone(),
            child,
            started_at: Utc::now(),
            phase: SessionPhase::Running,
            signals,
            reader: Some(reader),
            terminate_grace: self.terminate_grace,
        }))
    }
}

/// A supervised animation process.
#[derive(Debug)]
pub struct AnimationSession {
    handler: HandlerDescriptor,
    child: Child,
    started_at: DateTime<Utc>,
    phase: SessionPhase,
    signals: SignalReceiver,
    reader: Option<JoinHandle<()>>,
    terminate_grace: Duration,
}

impl AnimationSession {
    fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }

    /// Sends SIGTERM and waits out the grace period, then SIGKILLs.
    async fn stop_child(&mut self) {
        if let Ok(Some(status)) = self.child.try_wait() {
            tracing::debug!(animation = %self.handler.name, %status, "animation already exited");
            return;
        }

        request_stop(&mut self.child);
        match tokio::time::timeout(self.terminate_grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(animation = %self.handler.name, %status, "animation stopped");
            }
            Ok(Err(e)) => {
                tracing::warn!(animation = %self.handler.name, error = %e, "failed to wait for animation");
            }
            Err(_) => {
                tracing::warn!(
                    animation = %self.handler.name,
                    grace_ms = self.terminate_grace.as_millis(),
                    "animation ignored SIGTERM, killing"
                );
                if let Err(e) = self.child.kill().await {
                    tracing::warn!(animation = %self.handler.name, error = %e, "failed to kill animation");
                }
            }
        }
    }
}

impl SignalSource for AnimationSession {
    fn await_cover(&mut self, timeout: Duration) -> BoxFuture<'_, CoverOutcome> {
        Box::pin(async move {
            match self.phase {
                SessionPhase::Covered | SessionPhase::Finished => return CoverOutcome::Covered,
                SessionPhase::Exited | SessionPhase::Terminated => {
                    return CoverOutcome::ProcessExited
                }
                SessionPhase::Running => {}
            }

            match self.signals.recv_timeout(timeout).await {
                Received::Event(SignalEvent::Marker(Marker::Covered)) => {
                    tracing::debug!(animation = %self.handler.name, elapsed_ms = self.elapsed_ms(), "screen covered");
                    self.phase = SessionPhase::Covered;
                    CoverOutcome::Covered
                }
                Received::Event(SignalEvent::Marker(Marker::Finished)) => {
                    self.phase = SessionPhase::Finished;
                    CoverOutcome::Covered
                }
                Received::Event(SignalEvent::Exited) => {
                    self.phase = SessionPhase::Exited;
                    CoverOutcome::ProcessExited
                }
                Received::TimedOut => CoverOutcome::TimedOut,
            }
        })
    }

    fn await_finish(&mut self, timeout: Duration) -> BoxFuture<'_, FinishOutcome> {
        Box::pin(async move {
            let deadline = Instant::now() + timeout;
            loop {
                match self.phase {
                    SessionPhase::Finished => return FinishOutcome::Finished,
                    SessionPhase::Exited | SessionPhase::Terminated => {
                        return FinishOutcome::ProcessExited
                    }
                    SessionPhase::Running | SessionPhase::Covered => {}
                }

                match self.signals.recv_until(deadline).await {
                    Received::Event(SignalEvent::Marker(Marker::Covered)) => {
                        self.phase = SessionPhase::Covered;
                    }
                    Received::Event(SignalEvent::Marker(Marker::Finished)) => {
                        tracing::debug!(animation = %self.handler.name, elapsed_ms = self.elapsed_ms(), "animation finished");
                        self.phase = SessionPhase::Finished;
                    }
                    Received::Event(SignalEvent::Exited) => self.phase = SessionPhase::Exited,
                    Received::TimedOut => return FinishOutcome::TimedOut,
                }
            }
        })
    }

    fn terminate(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.phase == SessionPhase::Terminated {
                return;
            }
            self.stop_child().await;
            if let Some(reader) = self.reader.take() {
                reader.abort();
            }
            self.phase = SessionPhase::Terminated;
            tracing::info!(
                animation = %self.handler.name,
                lifetime_ms = self.elapsed_ms(),
                "animation terminated"
            );
        })
    }

    fn handler_name(&self) -> &str {
        &self.handler.name
    }
}

#[cfg(unix)]
fn request_stop(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else { return };
    #[allow(clippy::cast_possible_wrap)]
    let target = Pid::from_raw(pid as i32);
    if let Err(e) = kill(target, Signal::SIGTERM) {
        tracing::debug!(pid, error = %e, "SIGTERM failed");
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) {
    let _ = child.start_kill();
}

async fn drain_stderr(name: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(animation = %name, stderr = %line, "animation stderr");
    }
}
