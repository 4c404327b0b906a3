//! Power action request model.
//!
//! A [`PowerActionRequest`] is built once from the invocation (CLI subcommand and
//! `--animation` flag) and never mutated afterwards.

use std::fmt;
use std::str::FromStr;

use super::error::PowerManagerError;

/// Animation name that selects instant mode.
pub const NO_ANIMATION: &str = "none";

/// The OS-level power transition to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerActionKind {
    Shutdown,
    Reboot,
    Suspend,
    Hibernate,
    Logout,
    /// Reboot into the Windows boot entry.
    Windows,
}

impl PowerActionKind {
    pub const ALL: [Self; 6] = [
        Self::Shutdown,
        Self::Reboot,
        Self::Suspend,
        Self::Hibernate,
        Self::Logout,
        Self::Windows,
    ];

    /// Lowercase name used on the command line, in config keys and in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::Reboot => "reboot",
            Self::Suspend => "suspend",
            Self::Hibernate => "hibernate",
            Self::Logout => "logout",
            Self::Windows => "windows",
        }
    }

    /// Whether the orchestrator process survives the action and must wait for resume.
    #[must_use]
    pub const fn resumes(self) -> bool {
        matches!(self, Self::Suspend | Self::Hibernate)
    }
}

impl fmt::Display for PowerActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerActionKind {
    type Err = PowerManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PowerManagerError::Config(format!("unknown power action: {s}")))
    }
}

/// How the power action should be covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationMode {
    /// Cover the screen with the named animation handler.
    Named(String),
    /// Perform the action instantly with no overlay.
    None,
}

impl AnimationMode {
    /// Parses a `--animation` value; `none` selects instant mode.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case(NO_ANIMATION) {
            Self::None
        } else {
            Self::Named(name.to_string())
        }
    }
}

impl fmt::Display for AnimationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::None => f.write_str(NO_ANIMATION),
        }
    }
}

/// A single invocation's intent.
///
/// `test_only` requests mean "preview the animation": the power action is never
/// invoked, and `kind` is only passed through to the animation process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerActionRequest {
    pub kind: PowerActionKind,
    pub animation: AnimationMode,
    pub test_only: bool,
}

impl PowerActionRequest {
    #[must_use]
    pub const fn new(kind: PowerActionKind, animation: AnimationMode) -> Self {
        Self {
            kind,
            animation,
            test_only: false,
        }
    }

    /// Builds a preview request that never reaches the power action.
    #[must_use]
    pub const fn preview(animation: AnimationMode) -> Self {
        Self {
            kind: PowerActionKind::Shutdown,
            animation,
            test_only: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animation_mode_none_is_case_insensitive() {
        assert_eq!(AnimationMode::from_name("None"), AnimationMode::None);
        assert_eq!(AnimationMode::from_name(""), AnimationMode::None);
        assert_eq!(
            AnimationMode::from_name("fire"),
            AnimationMode::Named("fire".to_string())
        );
    }

    #[test]
    fn kind_parses_every_cli_name() {
        for kind in PowerActionKind::ALL {
            assert_eq!(kind.as_str().parse::<PowerActionKind>().ok(), Some(kind));
        }
        assert!("halt".parse::<PowerActionKind>().is_err());
    }

    #[test]
    fn only_sleep_states_resume() {
        assert!(PowerActionKind::Suspend.resumes());
        assert!(PowerActionKind::Hibernate.resumes());
        assert!(!PowerActionKind::Reboot.resumes());
        assert!(!PowerActionKind::Logout.resumes());
    }

    #[test]
    fn preview_is_test_only() {
        let request = PowerActionRequest::preview(AnimationMode::None);
        assert!(request.test_only);
    }
}
