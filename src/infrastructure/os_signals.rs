//! OS termination signal handling.
//!
//! Turns `SIGINT`, `SIGTERM` and `SIGQUIT` into a [`CancellationToken`] so the
//! sequencer can route an interrupt through its normal cleanup path.

use tokio_util::sync::CancellationToken;

/// Registered termination signal streams.
///
/// Handlers are installed when this is constructed, so signals delivered
/// between [`ShutdownSignals::register`] and the first [`recv`](Self::recv)
/// are queued rather than killing the process.
#[cfg(unix)]
#[derive(Debug)]
struct ShutdownSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sigquit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    /// Installs the handlers. Must be called from inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if any handler cannot be registered.
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    /// Waits for the next termination signal.
    async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv() => tracing::info!("received SIGINT"),
            _ = self.sigterm.recv() => tracing::info!("received SIGTERM"),
            _ = self.sigquit.recv() => tracing::info!("received SIGQUIT"),
        }
    }
}

/// Cancels `token` on the first termination signal.
///
/// The handlers are installed before this returns; only the wait runs in a
/// spawned task. Must be called from inside a tokio runtime.
///
/// # Errors
///
/// Returns an error if the handlers cannot be registered.
#[cfg(unix)]
pub fn cancel_on_signal(token: CancellationToken) -> std::io::Result<()> {
    let mut signals = ShutdownSignals::register()?;
    tokio::spawn(async move {
        signals.recv().await;
        token.cancel();
    });
    Ok(())
}

/// Cancels `token` on Ctrl-C.
///
/// # Errors
///
/// Never fails on this platform; registration errors are logged by the task.
#[cfg(not(unix))]
pub fn cancel_on_signal(token: CancellationToken) -> std::io::Result<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => token.cancel(),
            Err(e) => tracing::warn!(error = %e, "failed to register signal handlers"),
        }
    });
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use nix::sys::signal::{raise, Signal};
    use std::time::Duration;

    #[tokio::test]
    async fn signal_raised_right_after_registration_cancels() {
        let token = CancellationToken::new();
        cancel_on_signal(token.clone()).unwrap();

        // No await between registration and delivery.
        raise(Signal::SIGTERM).unwrap();

        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .expect("token cancelled by SIGTERM");
    }
}
