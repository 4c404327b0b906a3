//! Domain layer for power-manager.
//!
//! Core types shared by every other layer, independent of processes, sockets
//! or the command line.
//!
//! # Organization
//!
//! - [`action`]: Power action request model
//! - [`error`]: Error types and result alias
//! - [`handler`]: Animation handler descriptor
//! - [`phase`]: Sequencer phases

pub mod action;
pub mod error;
pub mod handler;
pub mod phase;

pub use action::{AnimationMode, PowerActionKind, PowerActionRequest, NO_ANIMATION};
pub use error::{PowerManagerError, Result};
pub use handler::{HandlerDescriptor, PROTOCOL_VERSION};
pub use phase::{SequencePhase, Terminal};
