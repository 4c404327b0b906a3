//! Power action invocation.
//!
//! The sequencer treats the OS action as a black box behind [`PowerInvoker`]:
//! one call per invocation, success or failure, never retried.
//!
//! - [`commands`]: Configurable command lines per action
//! - [`CommandInvoker`]: Runs those commands as child processes

pub mod commands;

pub use commands::PowerCommands;

use crate::domain::{PowerActionKind, PowerManagerError, Result};
use commands::SESSION_PLACEHOLDER;
use futures_util::future::BoxFuture;
use std::process::Stdio;
use tokio::process::Command;

/// Environment variable holding the current login session id.
const SESSION_ID_ENV: &str = "XDG_SESSION_ID";

/// Issues an OS-level power action.
pub trait PowerInvoker: Send + Sync {
    /// Performs `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`PowerManagerError::ActionInvocation`] with the underlying reason
    /// if the action could not be requested.
    fn invoke(&self, kind: PowerActionKind) -> BoxFuture<'_, Result<()>>;
}

/// Invokes power actions by running system commands.
#[derive(Debug, Clone, Default)]
pub struct CommandInvoker {
    commands: PowerCommands,
}

impl CommandInvoker {
    #[must_use]
    pub const fn new(commands: PowerCommands) -> Self {
        Self { commands }
    }

    async fn run(&self, kind: PowerActionKind) -> Result<()> {
        let failure = |reason: String| PowerManagerError::ActionInvocation {
            action: kind,
            reason,
        };

        if kind == PowerActionKind::Windows {
            self.select_windows_boot().await;
        }

        let mut argv = self.commands.argv(kind).to_vec();
        if argv.iter().any(|arg| arg.contains(SESSION_PLACEHOLDER)) {
            let session = session_id()
                .await
                .ok_or_else(|| failure("could not determine session ID".to_string()))?;
            tracing::debug!(session = %session, "resolved login session");
            for arg in &mut argv {
                *arg = arg.replace(SESSION_PLACEHOLDER, &session);
            }
        }

        let (program, args) = argv
            .split_first()
            .ok_or_else(|| failure("no command configured".to_string()))?;

        tracing::info!(action = %kind, command = ?argv, "executing power action");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| failure(format!("{program}: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(failure(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            )))
        }
    }

    /// Points the firmware at the Windows entry for the next boot only.
    ///
    /// A failure is logged; the reboot still happens.
    async fn select_windows_boot(&self) {
        let argv = self.commands.boot_select_argv();
        let Some((program, args)) = argv.split_first() else {
            return;
        };
        tracing::debug!(command = ?argv, "setting next boot entry");
        match Command::new(program).args(args).stdin(Stdio::null()).output().await {
            Ok(output) if output.status.success() => {}
            Ok(output) => tracing::warn!(
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "could not set Windows boot entry"
            ),
            Err(e) => tracing::warn!(error = %e, "could not set Windows boot entry"),
        }
    }
}

impl PowerInvoker for CommandInvoker {
    fn invoke(&self, kind: PowerActionKind) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.run(kind))
    }
}

/// Current login session id from the environment or `loginctl`.
async fn session_id() -> Option<String> {
    if let Some(id) = std::env::var(SESSION_ID_ENV).ok().filter(|id| !id.trim().is_empty()) {
        return Some(id);
    }

    let output = Command::new("loginctl")
        .args(["list-sessions", "--no-legend"])
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;
    first_session(&String::from_utf8_lossy(&output.stdout))
}

/// First column of the first non-empty `loginctl list-sessions` line.
fn first_session(listing: &str) -> Option<String> {
    listing
        .lines()
        .find_map(|line| line.split_whitespace().next())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_session_skips_blank_lines() {
        let listing = "\n     2 1000 alice seat0 tty2\n     5 1000 alice\n";
        assert_eq!(first_session(listing).as_deref(), Some("2"));
        assert_eq!(first_session(""), None);
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_invocation_failure() {
        let invoker = CommandInvoker::new(PowerCommands {
            reboot: vec!["sh".into(), "-c".into(), "echo denied >&2; exit 1".into()],
            ..PowerCommands::default()
        });

        let err = invoker.invoke(PowerActionKind::Reboot).await.unwrap_err();
        assert!(err.is_action_failure());
        assert!(err.to_string().contains("denied"), "{err}");
    }

    #[tokio::test]
    async fn zero_exit_is_acknowledged() {
        let invoker = CommandInvoker::new(PowerCommands {
            suspend: vec!["true".into()],
            ..PowerCommands::default()
        });
        assert!(invoker.invoke(PowerActionKind::Suspend).await.is_ok());
    }

    #[tokio::test]
    async fn missing_program_is_an_invocation_failure() {
        let invoker = CommandInvoker::new(PowerCommands {
            shutdown: vec!["/nonexistent/power-manager-shutdown".into()],
            ..PowerCommands::default()
        });
        let err = invoker.invoke(PowerActionKind::Shutdown).await.unwrap_err();
        assert!(matches!(
            err,
            PowerManagerError::ActionInvocation { action: PowerActionKind::Shutdown, .. }
        ));
    }
}
