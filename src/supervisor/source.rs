//! Capability traits at the animation process boundary.
//!
//! The sequencer never touches a process directly. It asks a [`Launcher`] for a
//! [`SignalSource`] and drives the session through it, so tests can substitute
//! in-memory fakes for real child processes.

use crate::domain::{HandlerDescriptor, PowerActionRequest, Result};
use futures_util::future::BoxFuture;
use std::time::Duration;

/// Result of waiting for the screen to be covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverOutcome {
    Covered,
    TimedOut,
    ProcessExited,
}

/// Result of waiting for the animation to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    Finished,
    TimedOut,
    ProcessExited,
}

/// A running animation session.
///
/// Implementations must make [`terminate`](SignalSource::terminate) idempotent.
pub trait SignalSource: Send {
    /// Waits until the animation reports `COVERED`, exits, or `timeout` elapses.
    fn await_cover(&mut self, timeout: Duration) -> BoxFuture<'_, CoverOutcome>;

    /// Waits until the animation reports `FINISHED`, exits, or `timeout` elapses.
    fn await_finish(&mut self, timeout: Duration) -> BoxFuture<'_, FinishOutcome>;

    /// Stops the animation and releases its process resources.
    fn terminate(&mut self) -> BoxFuture<'_, ()>;

    /// Name of the handler backing this session.
    fn handler_name(&self) -> &str;
}

/// Starts animation sessions.
pub trait Launcher: Send + Sync {
    /// Launches `handler` for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`PowerManagerError::Launch`](crate::domain::PowerManagerError::Launch)
    /// if the handler cannot be started.
    fn launch(
        &self,
        handler: &HandlerDescriptor,
        request: &PowerActionRequest,
    ) -> Result<Box<dyn SignalSource>>;
}
