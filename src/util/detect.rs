//! Platform and user-directory detection for snap-autostart
//!
//! This module decides which login-item mechanism applies to the running host
//! and resolves the per-user directories the installers write into. All
//! environment lookups go through an injectable provider so the logic can be
//! tested without touching the process environment.

use std::{env, path::PathBuf};

use directories::BaseDirs;

use crate::{
    error::{InstallError, InstallResult},
    model::{Platform, PlatformInfo},
};

/// Environment variable lookup used by the resolvers in this module
pub trait EnvProvider: Fn(&str) -> Option<String> {}

impl<F> EnvProvider for F where F: Fn(&str) -> Option<String> {}

/// Reads from the real process environment
pub fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Detects the current platform
///
/// # Returns
///
/// A `PlatformInfo` containing:
/// - `os`: The operating system name ("linux", "windows", "macos", ...)
/// - `platform`: `MacOS` on macOS, `Windows` on Windows, `None` elsewhere
///
/// # Examples
///
/// ```
/// use snap_autostart::util::detect::detect_platform;
///
/// let info = detect_platform();
/// println!("Running on: {} ({})", info.os, info.platform);
/// ```
pub fn detect_platform() -> PlatformInfo {
    let os = env::consts::OS.to_string();

    #[cfg(target_os = "macos")]
    let platform = Platform::MacOS;

    #[cfg(target_os = "windows")]
    let platform = Platform::Windows;

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let platform = Platform::None;

    PlatformInfo::new(os, platform)
}

/// Returns a variable's value, treating empty strings as unset
fn non_empty<E: EnvProvider>(env: &E, key: &str) -> Option<String> {
    env(key).filter(|value| !value.trim().is_empty())
}

/// Resolves the user's home directory
///
/// `$HOME` wins; otherwise the OS account database is consulted.
pub fn home_dir<E: EnvProvider>(env: &E) -> InstallResult<PathBuf> {
    if let Some(home) = non_empty(env, "HOME") {
        return Ok(PathBuf::from(home));
    }

    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| InstallError::UserDirectoryUnavailable {
            variable: "HOME".to_string(),
        })
}

/// Resolves the roaming application-data directory (`%APPDATA%`)
pub fn roaming_app_data<E: EnvProvider>(env: &E) -> InstallResult<PathBuf> {
    if let Some(app_data) = non_empty(env, "APPDATA") {
        return Ok(PathBuf::from(app_data));
    }

    // Only meaningful on Windows, where config_dir() is FOLDERID_RoamingAppData.
    if cfg!(target_os = "windows") {
        if let Some(dirs) = BaseDirs::new() {
            return Ok(dirs.config_dir().to_path_buf());
        }
    }

    Err(InstallError::UserDirectoryUnavailable {
        variable: "APPDATA".to_string(),
    })
}

/// Resolves the macOS per-user LaunchAgents directory
pub fn launch_agents_dir<E: EnvProvider>(env: &E) -> InstallResult<PathBuf> {
    Ok(home_dir(env)?.join("Library").join("LaunchAgents"))
}

/// Resolves the Windows per-user Startup folder
pub fn startup_dir<E: EnvProvider>(env: &E) -> InstallResult<PathBuf> {
    Ok(roaming_app_data(env)?
        .join("Microsoft")
        .join("Windows")
        .join("Start Menu")
        .join("Programs")
        .join("Startup"))
}
