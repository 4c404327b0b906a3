//! Filesystem locations used by power-manager.
//!
//! Resolves the configuration file, the debug log, and the ordered list of
//! directories that may hold animation handlers.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the animation search root.
pub const ANIMATIONS_DIR_ENV: &str = "SHUTDOWN_EFFECTS_DIR";

/// Default debug log location.
pub const DEFAULT_DEBUG_LOG: &str = "/tmp/power-manager-debug.log";

/// Returns the power-manager configuration directory.
///
/// Resolves to `$XDG_CONFIG_HOME/power-manager`, typically
/// `~/.config/power-manager`. Falls back to the current directory when no
/// home directory is known.
#[must_use]
fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("power-manager")
}

/// Returns the default path of the TOML configuration file.
#[must_use]
pub fn default_config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Expands a leading `~` to the user's home directory.
///
/// # Examples
///
/// ```
/// use power_manager::infrastructure::expand_tilde;
///
/// assert_eq!(expand_tilde("/absolute/path"), std::path::PathBuf::from("/absolute/path"));
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path, home) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}

/// Candidate animation roots in precedence order.
///
/// 1. `override_dir`, normally the value of [`ANIMATIONS_DIR_ENV`]
/// 2. `configured`, the `animations_dir` config value
/// 3. `$XDG_CONFIG_HOME/shutdown-effect/animations`
/// 4. `shutdown-effect/animations` next to the directory holding the executable
///
/// Candidates are returned whether or not they exist; discovery picks the
/// first one that is a directory.
#[must_use]
pub fn animation_search_roots(
    override_dir: Option<&Path>,
    configured: Option<&Path>,
) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    roots.extend(override_dir.map(Path::to_path_buf));
    roots.extend(configured.map(Path::to_path_buf));
    if let Some(config) = dirs::config_dir() {
        roots.push(config.join("shutdown-effect").join("animations"));
    }
    if let Some(sibling) = sibling_animations_dir() {
        roots.push(sibling);
    }
    roots
}

/// `<exe dir>/../shutdown-effect/animations`, for side-by-side installs.
fn sibling_animations_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let parent = exe.parent()?.parent()?;
    Some(parent.join("shutdown-effect").join("animations"))
}
