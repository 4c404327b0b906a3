//! power-manager: animated shutdown, reboot, suspend and logout.
//!
//! power-manager covers the screen with a full-screen animation before a power
//! action and guarantees the desktop is restored afterward, whatever happens:
//! - Pluggable animation handlers discovered from disk
//! - A line-oriented milestone protocol (`COVERED`, `FINISHED`) on stdout
//! - Instant mode when an animation is missing, slow or crashes
//! - Resume detection after suspend and hibernate
//! - Idempotent cleanup that thaws the screen and restores the cursor
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  CLI (main.rs)                                      │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Sequencer (sequencer/)                             │  ← State machine
//! │  - Phase transitions                                │
//! │  - Degradation to instant mode                      │
//! │  - Resume detection                                 │
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ Supervisor    │   │ Power         │   │ Cleanup       │
//! │ (supervisor/) │   │ (power/)      │   │ (cleanup/)    │
//! │ - Child proc  │   │ - Commands    │   │ - Reap child  │
//! │ - Timeouts    │   │ - Session id  │   │ - Wayfire IPC │
//! │ - Signals     │   │               │   │ - Retries     │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Registry (registry/) and signal channel (signal/)  │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Infrastructure & Domain Layers                     │
//! │  - Paths, OS signals (infrastructure/)              │
//! │  - Errors, requests, phases (domain/)               │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`domain`]: Core types (requests, handler descriptors, phases, errors)
//! - [`infrastructure`]: Paths and OS signal handling
//! - [`registry`]: Animation handler discovery and lookup
//! - [`signal`]: Bounded milestone channel fed from animation stdout
//! - [`supervisor`]: Animation process lifetime
//! - [`power`]: OS power action invocation
//! - [`cleanup`]: Display restoration
//! - [`sequencer`]: The phase state machine
//! - [`observability`]: Rotating debug log
//!
//! # Configuration
//!
//! Read from `~/.config/power-manager/config.toml` or `--config`. Every key is
//! optional:
//!
//! ```toml
//! default_animation = "fire"
//! debug_log = "/tmp/power-manager-debug.log"
//! trace_level = "info"
//! animations_dir = "~/.config/shutdown-effect/animations"
//! hold_seconds = 3
//!
//! [timeouts]
//! cover_ms = 5000
//! finish_ms = 30000
//! terminate_grace_ms = 2000
//! resume_ms = 120000
//! resume_settle_ms = 3000
//!
//! [cleanup]
//! retry_attempts = 5
//! retry_delay_ms = 1000
//!
//! [commands]
//! shutdown = ["systemctl", "poweroff"]
//! windows_boot_entry = "0003"
//! ```

#![allow(clippy::multiple_crate_versions)]

pub mod cleanup;
pub mod domain;
pub mod infrastructure;
pub mod observability;
pub mod power;
pub mod registry;
pub mod sequencer;
pub mod signal;
pub mod supervisor;

pub use domain::{
    AnimationMode, PowerActionKind, PowerActionRequest, PowerManagerError, Result, SequencePhase,
    Terminal,
};
pub use sequencer::{ActionSequencer, SequenceReport, SequencerSettings};

use cleanup::RetryPolicy;
use infrastructure::paths;
use power::PowerCommands;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Animation used when the command line names none.
    pub default_animation: String,

    /// Rotating debug log.
    pub debug_log: PathBuf,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub trace_level: String,

    /// Animation root, consulted after `SHUTDOWN_EFFECTS_DIR`. `~` is expanded.
    pub animations_dir: Option<String>,

    /// How long `test` keeps a covered animation on screen.
    pub hold_seconds: u64,

    /// `[timeouts]` table.
    pub timeouts: Timeouts,
    /// `[cleanup]` table.
    pub cleanup: CleanupConfig,
    /// `[commands]` table: argv per power action.
    pub commands: PowerCommands,
}

/// Phase timeouts in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    /// Wait for `COVERED` after launch before falling back to instant mode.
    pub cover_ms: u64,
    /// Wait for `FINISHED` once a shutdown-like action has been invoked.
    pub finish_ms: u64,
    /// Time between SIGTERM and SIGKILL when stopping an animation.
    pub terminate_grace_ms: u64,
    /// Wait for the machine to come back after suspend or hibernate.
    pub resume_ms: u64,
    /// Pause after resume before the display is restored.
    pub resume_settle_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            cover_ms: 5_000,
            finish_ms: 30_000,
            terminate_grace_ms: 2_000,
            resume_ms: 120_000,
            resume_settle_ms: 3_000,
        }
    }
}

/// Display-restore retry schedule used after resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanupConfig {
    /// Total display-restore attempts, the first one included.
    pub retry_attempts: u32,
    /// Pause between failed attempts.
    pub retry_delay_ms: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 5,
            retry_delay_ms: 1_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_animation: "fire".to_string(),
            debug_log: PathBuf::from(paths::DEFAULT_DEBUG_LOG),
            trace_level: "info".to_string(),
            animations_dir: None,
            hold_seconds: 3,
            timeouts: Timeouts::default(),
            cleanup: CleanupConfig::default(),
            commands: PowerCommands::default(),
        }
    }
}

impl Config {
    /// Loads configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PowerManagerError::Io`] if the file cannot be read and
    /// [`PowerManagerError::Toml`] if it is malformed or has unknown keys.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = paths::default_config_file();
                if path.is_file() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parses the file at `path`.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        text.parse()
    }

    /// The configured animation root with `~` expanded.
    #[must_use]
    pub fn animations_dir(&self) -> Option<PathBuf> {
        self.animations_dir.as_deref().map(paths::expand_tilde)
    }

    /// Grace period handed to the process launcher.
    #[must_use]
    pub const fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.timeouts.terminate_grace_ms)
    }

    /// Retry schedule for the cleanup coordinator.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.cleanup.retry_attempts,
            delay: Duration::from_millis(self.cleanup.retry_delay_ms),
        }
    }

    /// Timeouts, hold and default animation for the sequencer.
    #[must_use]
    pub fn sequencer_settings(&self) -> SequencerSettings {
        SequencerSettings {
            default_animation: self.default_animation.clone(),
            cover_timeout: Duration::from_millis(self.timeouts.cover_ms),
            finish_timeout: Duration::from_millis(self.timeouts.finish_ms),
            resume_timeout: Duration::from_millis(self.timeouts.resume_ms),
            resume_settle: Duration::from_millis(self.timeouts.resume_settle_ms),
            hold: Duration::from_secs(self.hold_seconds),
        }
    }
}

impl std::str::FromStr for Config {
    type Err = PowerManagerError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sequencer_settings(), SequencerSettings::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config: Config = r#"
            default_animation = "matrix"
            [timeouts]
            cover_ms = 250
            [commands]
            shutdown = ["systemctl", "poweroff"]
        "#
        .parse()
        .unwrap();

        assert_eq!(config.default_animation, "matrix");
        assert_eq!(config.timeouts.cover_ms, 250);
        assert_eq!(config.timeouts.finish_ms, 30_000);
        assert_eq!(config.commands.shutdown, ["systemctl", "poweroff"]);
        assert_eq!(config.commands.reboot, PowerCommands::default().reboot);
        assert_eq!(
            config.sequencer_settings().cover_timeout,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn tables_convert_to_runtime_durations() {
        let config: Config = r#"
            hold_seconds = 4
            [timeouts]
            terminate_grace_ms = 750
            resume_settle_ms = 10
            [cleanup]
            retry_attempts = 2
            retry_delay_ms = 40
        "#
        .parse()
        .unwrap();

        assert_eq!(config.terminate_grace(), Duration::from_millis(750));
        let retry = config.retry_policy();
        assert_eq!(retry.attempts, 2);
        assert_eq!(retry.delay, Duration::from_millis(40));
        let settings = config.sequencer_settings();
        assert_eq!(settings.hold, Duration::from_secs(4));
        assert_eq!(settings.resume_settle, Duration::from_millis(10));
        assert_eq!(settings.resume_timeout, Duration::from_millis(120_000));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = "defualt_animation = \"fire\"".parse::<Config>().unwrap_err();
        assert!(matches!(err, PowerManagerError::Toml(_)));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, PowerManagerError::Io(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "hold_seconds = 1\n[cleanup]\nretry_attempts = 2\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sequencer_settings().hold, Duration::from_secs(1));
        assert_eq!(config.retry_policy().attempts, 2);
    }
}
