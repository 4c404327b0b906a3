//! Action sequencer.
//!
//! - [`machine`]: the phase state machine driving one power action
//! - [`wake`]: resume detection after suspend or hibernate

pub mod machine;
pub mod wake;

pub use machine::{ActionSequencer, SequenceReport, SequencerSettings};
pub use wake::{ClockJumpWake, WakeSource};
