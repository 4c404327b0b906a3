//! Sequencer phases.
//!
//! ```text
//! Idle → Launching → AwaitingCover → ActionInFlight ─┬─────────────────────────→ AwaitingFinish → Cleanup → Terminal
//!   │                                    ▲            └→ SuspendedAwaitingResume ─┘
//!   └────────────── instant mode ────────┘
//! ```

use std::fmt;

/// How a sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Success,
    Failed,
}

/// The single authoritative state of the action sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePhase {
    Idle,
    Launching,
    AwaitingCover,
    ActionInFlight,
    SuspendedAwaitingResume,
    AwaitingFinish,
    Cleanup,
    Terminal(Terminal),
}

impl SequencePhase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    /// Position in the forward-only ordering of phases.
    const fn rank(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Launching => 1,
            Self::AwaitingCover => 2,
            Self::ActionInFlight => 3,
            Self::SuspendedAwaitingResume => 4,
            Self::AwaitingFinish => 5,
            Self::Cleanup => 6,
            Self::Terminal(_) => 7,
        }
    }

    /// Whether moving from `self` to `next` respects the one-directional ordering.
    ///
    /// Phases may be skipped but never revisited.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for SequencePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Launching => "launching",
            Self::AwaitingCover => "awaiting-cover",
            Self::ActionInFlight => "action-in-flight",
            Self::SuspendedAwaitingResume => "suspended-awaiting-resume",
            Self::AwaitingFinish => "awaiting-finish",
            Self::Cleanup => "cleanup",
            Self::Terminal(Terminal::Success) => "terminal(success)",
            Self::Terminal(Terminal::Failed) => "terminal(failed)",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_only_move_forward() {
        assert!(SequencePhase::Idle.can_advance_to(SequencePhase::ActionInFlight));
        assert!(SequencePhase::AwaitingCover.can_advance_to(SequencePhase::Cleanup));
        assert!(!SequencePhase::AwaitingFinish.can_advance_to(SequencePhase::Launching));
        assert!(!SequencePhase::Cleanup.can_advance_to(SequencePhase::Cleanup));
    }

    #[test]
    fn terminal_phases_are_final() {
        let done = SequencePhase::Terminal(Terminal::Success);
        assert!(done.is_terminal());
        assert!(!done.can_advance_to(SequencePhase::Terminal(Terminal::Failed)));
    }
}
