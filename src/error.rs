//! Error types for login-item installation
//!
//! This module defines the error type shared by the LaunchAgent and Startup
//! shortcut installers. Each variant carries the context an operator needs
//! and maps to an actionable remediation hint.

use std::path::PathBuf;

use crate::model::Platform;

/// Result type alias for installer operations
pub type InstallResult<T> = Result<T, InstallError>;

/// Error type for installer operations
///
/// Each variant includes detailed context and provides remediation hints
/// through the `remediation_hint()` method.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// No login-item mechanism is implemented for this platform
    #[error("Login-item installation is not supported on platform '{platform}'")]
    UnsupportedPlatform {
        /// Platform that was requested or detected
        platform: Platform,
    },

    /// A required per-user directory variable could not be resolved
    #[error("Could not determine the user directory from ${variable}")]
    UserDirectoryUnavailable {
        /// Environment variable that was consulted (HOME, APPDATA)
        variable: String,
    },

    /// The configured property-list template does not exist
    #[error("LaunchAgent template not found at {}", .path.display())]
    TemplateNotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// The template or its rendered output is not a usable property list
    #[error("Invalid LaunchAgent template: {reason}")]
    InvalidTemplate {
        /// What is wrong with the template
        reason: String,
    },

    /// Placeholder tokens survived substitution
    #[error("Rendered property list still contains placeholders: {}", .placeholders.join(", "))]
    UnresolvedPlaceholders {
        /// Tokens still present, in order of first appearance
        placeholders: Vec<String>,
    },

    /// The template declares a different label than the one configured
    #[error("Template label '{found}' does not match configured label '{expected}'")]
    LabelMismatch {
        /// Label from configuration
        expected: String,
        /// Label found in the template
        found:    String,
    },

    /// An explicitly configured Python interpreter does not exist
    #[error("Python interpreter not found at {}", .path.display())]
    InterpreterNotFound {
        /// Configured interpreter path
        path: PathBuf,
    },

    /// An OS service-management command failed
    #[error("`{command}` failed (exit code {}): {stderr}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    ServiceCommandFailed {
        /// Command line that was executed
        command: String,
        /// Exit code, if the process exited normally
        code:    Option<i32>,
        /// Captured standard error, trimmed
        stderr:  String,
    },

    /// Invalid parameter provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: String,
        /// Reason why it's invalid
        reason:    String,
    },

    /// A `.lnk` file could not be decoded
    #[error("Malformed shortcut file: {reason}")]
    MalformedShortcut {
        /// Decoding failure
        reason: String,
    },

    /// The configuration file could not be read or parsed
    #[error("Configuration error in {}: {reason}", .path.display())]
    Config {
        /// Configuration file path
        path:   PathBuf,
        /// Parse or read failure
        reason: String,
    },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl InstallError {
    /// Returns an actionable remediation hint for this error
    ///
    /// # Examples
    ///
    /// ```
    /// use snap_autostart::{error::InstallError, model::Platform};
    ///
    /// let error = InstallError::UnsupportedPlatform {
    ///     platform: Platform::None,
    /// };
    /// assert!(error.remediation_hint().contains("--platform"));
    /// ```
    pub fn remediation_hint(&self) -> &str {
        match self {
            InstallError::UnsupportedPlatform { .. } => {
                "Only macOS (LaunchAgent) and Windows (Startup shortcut) are supported. Pass \
                 --platform macos or --platform windows to render for another host."
            }
            InstallError::UserDirectoryUnavailable { variable } => match variable.as_str() {
                "APPDATA" => {
                    "Set %APPDATA% to the roaming profile directory (usually \
                     C:\\Users\\<name>\\AppData\\Roaming) or pass a startup folder in the config."
                }
                _ => "Set $HOME to your home directory and run the installer again.",
            },
            InstallError::TemplateNotFound { .. } => {
                "Run the installer from the snap_tools directory, or pass --template with the \
                 path to the .plist template."
            }
            InstallError::InvalidTemplate { .. } => {
                "The template must be an XML property list with a <plist> root and a Label key. \
                 Compare it against the bundled default shown by `snap-autostart render`."
            }
            InstallError::UnresolvedPlaceholders { .. } => {
                "Only __INSTALL_PATH__ and __PYTHON_PATH__ are substituted. Remove or replace any \
                 other __TOKEN__ in the template."
            }
            InstallError::LabelMismatch { .. } => {
                "Make the Label key in the template match [launch_agent].label in \
                 snap-autostart.toml, or remove the label override."
            }
            InstallError::InterpreterNotFound { .. } => {
                "Create the virtual environment (python3 -m venv venv) or pass --python with an \
                 existing interpreter."
            }
            InstallError::ServiceCommandFailed { command, .. } => {
                if command.starts_with("launchctl") {
                    "Check the plist with `plutil -lint` and inspect `launchctl list` output. If \
                     the agent is stuck, log out and back in, then reinstall."
                } else {
                    "The service command failed. Re-run with RUST_LOG=snap_autostart=debug for \
                     details."
                }
            }
            InstallError::InvalidParameter { parameter, .. } => match parameter.as_str() {
                "target" | "working_dir" => {
                    "Shortcut paths must be absolute drive-letter paths such as \
                     D:\\dev\\snap_tools\\run.bat."
                }
                "name" => "Shortcut names must be plain file names ending in .lnk.",
                "label" => "Labels use reverse-DNS form, for example com.snaptools.snaptool.",
                _ => "Check the parameter value against `snap-autostart --help`.",
            },
            InstallError::MalformedShortcut { .. } => {
                "The existing shortcut is not a valid Shell Link. Run `snap-autostart uninstall` \
                 and install again."
            }
            InstallError::Config { .. } => {
                "Fix the TOML syntax in snap-autostart.toml. Every key is optional; delete the \
                 file to fall back to defaults."
            }
            InstallError::IoError(_) => {
                "An I/O error occurred. Check file permissions and that the target directories \
                 are writable."
            }
        }
    }
}
