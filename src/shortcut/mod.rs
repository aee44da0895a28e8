//! Windows Startup folder shortcut management
//!
//! Creates the `.lnk` file that launches snap_tool's `run.bat` at login.
//! Links are produced by a pure Rust Shell Link encoder, so shortcuts can be
//! generated and checked from any host.
//!
//! # Example
//!
//! ```
//! use snap_autostart::shortcut::{StartupShortcut, StartupShortcutConfig};
//!
//! let startup = tempfile::tempdir().unwrap();
//! let config = StartupShortcutConfig::for_install_dir(r"D:\dev\snap_tools", startup.path());
//! let report = StartupShortcut::new(config).create().unwrap();
//! assert_eq!(report.target.as_deref(), Some(r"D:\dev\snap_tools\run.bat"));
//! ```

mod lnk;
mod manager;

pub use lnk::{ShellLink, is_drive_absolute};
pub use manager::{StartupShortcut, StartupShortcutConfig, windows_join};
