//! Animation supervisor.
//!
//! Owns the lifetime of the single animation process of an invocation:
//! launching it, reading its milestones with timeouts, and stopping it.
//!
//! - [`source`]: [`Launcher`] and [`SignalSource`] capability traits
//! - [`process`]: tokio child-process implementation

pub mod process;
pub mod source;

pub use process::{AnimationSession, ProcessLauncher, SessionPhase, ACTION_ENV};
pub use source::{CoverOutcome, FinishOutcome, Launcher, SignalSource};
