//! Data models and type definitions for snap-autostart
//!
//! This module defines the core types used throughout the installer:
//! - Platform detection types
//! - Shortcut window styles
//! - Report structures printed by the CLI (human or `--json`)

use std::{path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::InstallError;

/// Login-item mechanism available on the current platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// No supported mechanism
    None,
    /// macOS per-user LaunchAgent
    #[serde(rename = "macos")]
    MacOS,
    /// Windows Startup folder shortcut
    Windows,
}

impl Platform {
    /// Returns the platform as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::None => "none",
            Platform::MacOS => "macos",
            Platform::Windows => "windows",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "macos" | "darwin" | "osx" => Ok(Platform::MacOS),
            "windows" | "win32" | "win" => Ok(Platform::Windows),
            other => Err(InstallError::InvalidParameter {
                parameter: "platform".to_string(),
                reason:    format!("unknown platform '{other}', expected macos or windows"),
            }),
        }
    }
}

/// Platform information for the running host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    /// Operating system name (e.g., "linux", "windows", "macos")
    pub os:       String,
    /// Login-item mechanism for this OS
    pub platform: Platform,
}

impl PlatformInfo {
    /// Creates a new PlatformInfo instance
    pub fn new(os: String, platform: Platform) -> Self {
        Self { os, platform }
    }
}

/// Window style applied when Windows launches a shortcut
///
/// Values are the Win32 `SW_*` show commands stored in the Shell Link header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowStyle {
    /// `SW_SHOWNORMAL`
    Normal,
    /// `SW_SHOWMAXIMIZED`
    Maximized,
    /// `SW_SHOWMINNOACTIVE`
    #[default]
    Minimized,
}

impl WindowStyle {
    /// Show command written into the link header
    pub fn show_command(self) -> u32 {
        match self {
            WindowStyle::Normal => 1,
            WindowStyle::Maximized => 3,
            WindowStyle::Minimized => 7,
        }
    }

    /// Maps a stored show command back to a style
    ///
    /// Windows treats every value other than 3 and 7 as `SW_SHOWNORMAL`.
    pub fn from_show_command(value: u32) -> Self {
        match value {
            3 => WindowStyle::Maximized,
            7 => WindowStyle::Minimized,
            _ => WindowStyle::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowStyle::Normal => "normal",
            WindowStyle::Maximized => "maximized",
            WindowStyle::Minimized => "minimized",
        }
    }
}

impl std::fmt::Display for WindowStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of installing the LaunchAgent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentInstallReport {
    /// launchd label
    pub label:             String,
    /// Property list written into LaunchAgents
    pub plist_path:        PathBuf,
    /// Interpreter substituted for `__PYTHON_PATH__`
    pub python_path:       PathBuf,
    /// Real executable behind `python_path`, if it could be resolved
    pub resolved_python:   Option<PathBuf>,
    /// Whether an earlier registration was unloaded and replaced
    pub replaced_previous: bool,
}

/// Result of removing the LaunchAgent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentUninstallReport {
    /// launchd label
    pub label:      String,
    /// Property list location
    pub plist_path: PathBuf,
    /// Whether a plist was found and deleted
    pub removed:    bool,
}

/// Loaded state reported by the service manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LaunchAgentStatus {
    /// launchd does not know the label
    NotLoaded,
    /// launchd has the job loaded
    Loaded {
        /// Process id when the job is running
        pid:              Option<u32>,
        /// Exit status of the last run
        last_exit_status: Option<i32>,
    },
}

impl LaunchAgentStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LaunchAgentStatus::Loaded { .. })
    }
}

/// Combined plist and launchd state for `status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStatusReport {
    pub label:        String,
    pub plist_path:   PathBuf,
    pub plist_exists: bool,
    pub status:       LaunchAgentStatus,
}

/// Startup shortcut state after `install`, `uninstall` or `status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortcutReport {
    /// Location of the `.lnk` file
    pub path:         PathBuf,
    /// Whether the file exists after the operation
    pub exists:       bool,
    /// Link target, when known
    pub target:       Option<String>,
    /// Working directory, when known
    pub working_dir:  Option<String>,
    /// Window style, when known
    pub window_style: Option<WindowStyle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_serialization() {
        assert_eq!(serde_json::to_string(&Platform::None).unwrap(), r#""none""#);
        assert_eq!(serde_json::to_string(&Platform::MacOS).unwrap(), r#""macos""#);
        assert_eq!(serde_json::to_string(&Platform::Windows).unwrap(), r#""windows""#);
    }

    #[test]
    fn test_platform_deserialization() {
        assert_eq!(serde_json::from_str::<Platform>(r#""macos""#).unwrap(), Platform::MacOS);
        assert_eq!(serde_json::from_str::<Platform>(r#""windows""#).unwrap(), Platform::Windows);
    }

    #[test]
    fn test_platform_from_str_aliases() {
        assert_eq!("darwin".parse::<Platform>().unwrap(), Platform::MacOS);
        assert_eq!("MacOS".parse::<Platform>().unwrap(), Platform::MacOS);
        assert_eq!(" win32 ".parse::<Platform>().unwrap(), Platform::Windows);

        let err = "linux".parse::<Platform>().unwrap_err();
        assert!(err.to_string().contains("unknown platform 'linux'"));
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(format!("{}", Platform::MacOS), "macos");
        assert_eq!(format!("{}", Platform::None), "none");
    }

    #[test]
    fn test_window_style_show_commands() {
        assert_eq!(WindowStyle::Normal.show_command(), 1);
        assert_eq!(WindowStyle::Maximized.show_command(), 3);
        assert_eq!(WindowStyle::Minimized.show_command(), 7);

        assert_eq!(WindowStyle::from_show_command(3), WindowStyle::Maximized);
        assert_eq!(WindowStyle::from_show_command(7), WindowStyle::Minimized);
        assert_eq!(WindowStyle::from_show_command(0), WindowStyle::Normal);
        assert_eq!(WindowStyle::from_show_command(42), WindowStyle::Normal);
    }

    #[test]
    fn test_window_style_defaults_to_minimized() {
        assert_eq!(WindowStyle::default(), WindowStyle::Minimized);
        assert_eq!(serde_json::to_string(&WindowStyle::Maximized).unwrap(), r#""maximized""#);
    }

    #[test]
    fn test_launch_agent_status_serialization() {
        let loaded = LaunchAgentStatus::Loaded {
            pid:              Some(321),
            last_exit_status: Some(0),
        };
        let json = serde_json::to_value(loaded).unwrap();
        assert_eq!(json["state"], "loaded");
        assert_eq!(json["pid"], 321);
        assert!(loaded.is_loaded());

        let json = serde_json::to_value(LaunchAgentStatus::NotLoaded).unwrap();
        assert_eq!(json["state"], "not_loaded");
        assert!(!LaunchAgentStatus::NotLoaded.is_loaded());
    }
}
