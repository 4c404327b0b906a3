//! Error types for power-manager.
//!
//! This module defines the centralized error type [`PowerManagerError`] and a type alias
//! [`Result`] used throughout the crate. Handler faults (`HandlerNotFound`, `Launch`,
//! `CoverTimeout`) are usually recorded as degradations rather than returned, while
//! `ActionInvocation` always ends the sequence.

use std::time::Duration;
use thiserror::Error;

use super::action::PowerActionKind;

/// The main error type for power-manager operations.
///
/// # Examples
///
/// ```
/// use power_manager::domain::PowerManagerError;
///
/// let err = PowerManagerError::HandlerNotFound { name: "doesnotexist".to_string() };
/// assert_eq!(err.to_string(), "no such animation: doesnotexist");
/// ```
#[derive(Debug, Error)]
pub enum PowerManagerError {
    /// The requested animation is not in the handler registry.
    #[error("no such animation: {name}")]
    HandlerNotFound { name: String },

    /// The animation process could not be started.
    #[error("failed to launch animation '{name}': {reason}")]
    Launch { name: String, reason: String },

    /// The animation never reported that the screen is covered.
    #[error("animation did not cover the screen within {timeout:?}")]
    CoverTimeout { timeout: Duration },

    /// The animation exited before covering the screen.
    #[error("animation exited before covering the screen")]
    CoverLost,

    /// The animation never reported completion after the power action.
    #[error("animation did not finish within {timeout:?}")]
    FinishTimeout { timeout: Duration },

    /// The OS refused or failed to perform the power action.
    ///
    /// The reason is surfaced verbatim to the user.
    #[error("{action} failed: {reason}")]
    ActionInvocation {
        action: PowerActionKind,
        reason: String,
    },

    /// Restoring display or input state failed.
    #[error("cleanup error: {0}")]
    Cleanup(String),

    /// A termination signal arrived before the sequence completed.
    #[error("interrupted by signal")]
    Interrupted,

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem, process or socket I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A TOML document could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PowerManagerError {
    /// Returns `true` for failures caused by the OS power action itself.
    #[must_use]
    pub const fn is_action_failure(&self) -> bool {
        matches!(self, Self::ActionInvocation { .. })
    }
}

/// A specialized `Result` type for power-manager operations.
pub type Result<T> = std::result::Result<T, PowerManagerError>;
