//! Command lines used to perform each power action.
//!
//! Defaults match a typical systemd desktop where privileged commands go
//! through `sudo -A` (askpass). Every entry can be overridden from the
//! `[commands]` table of the configuration file:
//!
//! ```toml
//! [commands]
//! shutdown = ["systemctl", "poweroff"]
//! reboot = ["systemctl", "reboot"]
//! windows_boot_entry = "0001"
//! ```

use crate::domain::PowerActionKind;
use serde::Deserialize;

/// Replaced with the login session id in any argument.
pub const SESSION_PLACEHOLDER: &str = "{session}";

/// Replaced with [`PowerCommands::windows_boot_entry`] in the boot selection command.
pub const BOOT_ENTRY_PLACEHOLDER: &str = "{entry}";

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(ToString::to_string).collect()
}

/// Per-action command lines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PowerCommands {
    pub shutdown: Vec<String>,
    pub reboot: Vec<String>,
    pub suspend: Vec<String>,
    pub hibernate: Vec<String>,
    pub logout: Vec<String>,
    pub windows: Vec<String>,
    /// Run before `windows` to select the next boot entry.
    pub windows_boot_select: Vec<String>,
    /// EFI boot entry of the Windows loader.
    pub windows_boot_entry: String,
}

impl Default for PowerCommands {
    fn default() -> Self {
        Self {
            shutdown: argv(&["sudo", "-A", "shutdown", "-h", "now"]),
            reboot: argv(&["sudo", "-A", "reboot"]),
            suspend: argv(&["systemctl", "suspend"]),
            hibernate: argv(&["systemctl", "hibernate"]),
            logout: argv(&["loginctl", "terminate-session", SESSION_PLACEHOLDER]),
            windows: argv(&["sudo", "-A", "reboot"]),
            windows_boot_select: argv(&["sudo", "-A", "efibootmgr", "--bootnext", BOOT_ENTRY_PLACEHOLDER]),
            windows_boot_entry: "0003".to_string(),
        }
    }
}

impl PowerCommands {
    /// The command line for `kind`, placeholders not yet substituted.
    #[must_use]
    pub fn argv(&self, kind: PowerActionKind) -> &[String] {
        match kind {
            PowerActionKind::Shutdown => &self.shutdown,
            PowerActionKind::Reboot => &self.reboot,
            PowerActionKind::Suspend => &self.suspend,
            PowerActionKind::Hibernate => &self.hibernate,
            PowerActionKind::Logout => &self.logout,
            PowerActionKind::Windows => &self.windows,
        }
    }

    /// The boot selection command with the configured entry filled in.
    #[must_use]
    pub fn boot_select_argv(&self) -> Vec<String> {
        self.windows_boot_select
            .iter()
            .map(|arg| arg.replace(BOOT_ENTRY_PLACEHOLDER, &self.windows_boot_entry))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_action() {
        let commands = PowerCommands::default();
        for kind in PowerActionKind::ALL {
            assert!(!commands.argv(kind).is_empty(), "{kind} has no command");
        }
    }

    #[test]
    fn boot_entry_is_substituted() {
        let commands = PowerCommands {
            windows_boot_entry: "0001".to_string(),
            ..PowerCommands::default()
        };
        assert_eq!(
            commands.boot_select_argv(),
            vec!["sudo", "-A", "efibootmgr", "--bootnext", "0001"]
        );
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let commands: PowerCommands = toml::from_str("shutdown = [\"systemctl\", \"poweroff\"]").unwrap();
        assert_eq!(commands.shutdown, vec!["systemctl", "poweroff"]);
        assert_eq!(commands.reboot, PowerCommands::default().reboot);
    }
}
