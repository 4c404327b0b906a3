//! Handler discovery.
//!
//! Scans an animation root for handler directories and produces a
//! [`HandlerRegistry`]. Each `<root>/<name>/` directory is a handler when it
//! contains, in order of preference:
//!
//! 1. `animation.toml` with a `command` array (and optional `protocol`)
//! 2. an executable file named `animate`
//! 3. `animate.py`, started with `python3`
//!
//! Unreadable entries, malformed manifests and manifests declaring a marker
//! protocol other than [`PROTOCOL_VERSION`] are skipped with a warning so a
//! single broken animation never hides the others.

use crate::domain::{
    HandlerDescriptor, PowerManagerError, Result, NO_ANIMATION, PROTOCOL_VERSION,
};
use crate::registry::HandlerRegistry;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "animation.toml";
const EXECUTABLE_ENTRY: &str = "animate";
const PYTHON_ENTRY: &str = "animate.py";
const PYTHON_INTERPRETER: &str = "python3";

/// Optional per-animation manifest.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    command: Vec<String>,
    #[serde(default = "default_protocol")]
    protocol: u32,
}

const fn default_protocol() -> u32 {
    PROTOCOL_VERSION
}

/// Builds a registry from the first existing directory in `roots`.
///
/// Returns the chosen root alongside the registry; an empty registry and
/// `None` when no candidate exists.
#[must_use]
pub fn discover(roots: &[PathBuf]) -> (HandlerRegistry, Option<PathBuf>) {
    let Some(root) = roots.iter().find(|root| root.is_dir()) else {
        tracing::warn!(candidates = ?roots, "no animation directory found");
        return (HandlerRegistry::new(), None);
    };

    match discover_in(root) {
        Ok(registry) => {
            tracing::debug!(root = %root.display(), count = registry.len(), "animations discovered");
            (registry, Some(root.clone()))
        }
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "failed to scan animation directory");
            (HandlerRegistry::new(), Some(root.clone()))
        }
    }
}

/// Scans a single animation root.
///
/// # Errors
///
/// Returns an error if `root` itself cannot be read.
pub fn discover_in(root: &Path) -> Result<HandlerRegistry> {
    let mut handlers = Vec::new();

    for entry in fs::read_dir(root)? {
        let Ok(entry) = entry else { continue };
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') || name.eq_ignore_ascii_case(NO_ANIMATION) {
            continue;
        }

        match describe(&name, &dir) {
            Ok(Some(handler)) => handlers.push(handler),
            Ok(None) => tracing::trace!(animation = %name, "directory has no entry point"),
            Err(e) => tracing::warn!(animation = %name, error = %e, "skipping animation"),
        }
    }

    Ok(handlers.into_iter().collect())
}

fn describe(name: &str, dir: &Path) -> Result<Option<HandlerDescriptor>> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if manifest_path.is_file() {
        let manifest: Manifest = toml::from_str(&fs::read_to_string(&manifest_path)?)?;
        if manifest.protocol != PROTOCOL_VERSION {
            return Err(PowerManagerError::Config(format!(
                "{}: unsupported protocol {} (expected {PROTOCOL_VERSION})",
                manifest_path.display(),
                manifest.protocol
            )));
        }
        let Some((program, args)) = manifest.command.split_first() else {
            return Err(PowerManagerError::Config(format!(
                "{}: command must not be empty",
                manifest_path.display()
            )));
        };
        let mut command = vec![resolve_program(program, dir)];
        command.extend(args.iter().cloned());
        return Ok(Some(HandlerDescriptor::new(name, command, dir.to_path_buf())));
    }

    let executable = dir.join(EXECUTABLE_ENTRY);
    if is_executable(&executable) {
        return Ok(Some(HandlerDescriptor::new(
            name,
            vec![executable.to_string_lossy().into_owned()],
            dir.to_path_buf(),
        )));
    }

    let script = dir.join(PYTHON_ENTRY);
    if script.is_file() {
        return Ok(Some(HandlerDescriptor::new(
            name,
            vec![
                PYTHON_INTERPRETER.to_string(),
                script.to_string_lossy().into_owned(),
            ],
            dir.to_path_buf(),
        )));
    }

    Ok(None)
}

/// Programs given as relative paths (`./run.sh`, `bin/anim`) live in the
/// animation directory; bare names are left for `PATH` lookup.
fn resolve_program(program: &str, dir: &Path) -> String {
    if program.contains('/') && Path::new(program).is_relative() {
        dir.join(program).to_string_lossy().into_owned()
    } else {
        program.to_string()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn animation(root: &Path, name: &str, file: &str, contents: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn python_script_runs_under_python3() {
        let root = TempDir::new().unwrap();
        animation(root.path(), "fire", PYTHON_ENTRY, "print('COVERED')");

        let registry = discover_in(root.path()).unwrap();
        let fire = registry.resolve("fire").unwrap();
        assert_eq!(fire.program(), Some("python3"));
        assert!(fire.args()[0].ends_with("fire/animate.py"));
        assert_eq!(fire.animation_dir, root.path().join("fire"));
    }

    #[test]
    fn manifest_takes_precedence_and_resolves_relative_program() {
        let root = TempDir::new().unwrap();
        animation(root.path(), "fade", PYTHON_ENTRY, "");
        animation(
            root.path(),
            "fade",
            MANIFEST_FILE,
            "command = [\"./run.sh\", \"--fast\"]\nprotocol = 1\n",
        );

        let registry = discover_in(root.path()).unwrap();
        let fade = registry.resolve("fade").unwrap();
        assert_eq!(fade.command[0], root.path().join("fade/run.sh").to_string_lossy());
        assert_eq!(fade.args(), ["--fast".to_string()]);
    }

    #[test]
    fn broken_manifest_skips_only_that_animation() {
        let root = TempDir::new().unwrap();
        animation(root.path(), "broken", MANIFEST_FILE, "command = 3");
        animation(root.path(), "sakura", PYTHON_ENTRY, "");

        let registry = discover_in(root.path()).unwrap();
        assert_eq!(registry.list_available(), vec!["sakura"]);
    }

    #[test]
    fn unsupported_protocol_skips_that_animation() {
        let root = TempDir::new().unwrap();
        animation(
            root.path(),
            "future",
            MANIFEST_FILE,
            &format!("command = [\"./run.sh\"]\nprotocol = {}\n", PROTOCOL_VERSION + 1),
        );
        animation(root.path(), "sakura", PYTHON_ENTRY, "");

        let err = describe("future", &root.path().join("future")).unwrap_err();
        assert!(err.to_string().contains("unsupported protocol"), "{err}");

        let registry = discover_in(root.path()).unwrap();
        assert_eq!(registry.list_available(), vec!["sakura"]);
    }

    #[test]
    fn reserved_and_empty_directories_are_ignored() {
        let root = TempDir::new().unwrap();
        animation(root.path(), "none", PYTHON_ENTRY, "");
        fs::create_dir_all(root.path().join("empty")).unwrap();

        assert!(discover_in(root.path()).unwrap().is_empty());
    }

    #[test]
    fn first_existing_root_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        animation(second.path(), "fire", PYTHON_ENTRY, "");

        let missing = first.path().join("missing");
        let (registry, root) = discover(&[missing, second.path().to_path_buf()]);
        assert_eq!(root.as_deref(), Some(second.path()));
        assert_eq!(registry.list_available(), vec!["fire"]);
    }

    #[test]
    fn no_roots_yield_empty_registry() {
        let (registry, root) = discover(&[PathBuf::from("/nonexistent/power-manager/animations")]);
        assert!(registry.is_empty());
        assert!(root.is_none());
    }
}
