//! Animation handler descriptor.
//!
//! A handler is an external executable that draws the overlay and reports the
//! `COVERED` / `FINISHED` milestones on its stdout. Descriptors are produced by
//! discovery and are read-only for the lifetime of an invocation.

use std::path::PathBuf;

/// Current version of the stdout marker protocol.
pub const PROTOCOL_VERSION: u32 = 1;

/// Describes how to start one animation handler.
///
/// # Fields
///
/// - `name`: Unique registry key, the directory name of the animation
/// - `command`: Program and arguments; the program is resolved by the OS
/// - `animation_dir`: Working directory the handler runs in
/// - `protocol`: Marker protocol version the handler speaks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub name: String,
    pub command: Vec<String>,
    pub animation_dir: PathBuf,
    pub protocol: u32,
}

impl HandlerDescriptor {
    /// Creates a descriptor speaking the current protocol version.
    ///
    /// # Examples
    ///
    /// ```
    /// use power_manager::domain::HandlerDescriptor;
    /// use std::path::PathBuf;
    ///
    /// let handler = HandlerDescriptor::new(
    ///     "fire",
    ///     vec!["python3".to_string(), "animate.py".to_string()],
    ///     PathBuf::from("/usr/share/shutdown-effect/animations/fire"),
    /// );
    /// assert_eq!(handler.program(), Some("python3"));
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, command: Vec<String>, animation_dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            command,
            animation_dir,
            protocol: PROTOCOL_VERSION,
        }
    }

    /// The executable to start, if the command is not empty.
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Arguments passed after the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }
}
