use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use super::lnk::{ShellLink, is_drive_absolute};
use crate::{
    error::{InstallError, InstallResult},
    model::{ShortcutReport, WindowStyle},
    util::fs::write_atomic,
};

/// Joins a Windows directory and file name with a backslash
pub fn windows_join(dir: &str, file: &str) -> String {
    format!("{}\\{}", dir.trim_end_matches(['\\', '/']), file)
}

/// Settings for the Startup folder shortcut
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupShortcutConfig {
    /// File name inside the Startup folder
    pub name:         String,
    /// Batch file launched at login
    pub target:       String,
    /// Start-in directory
    pub working_dir:  String,
    pub window_style: WindowStyle,
    pub description:  String,
    pub arguments:    Option<String>,
    /// `%APPDATA%\Microsoft\Windows\Start Menu\Programs\Startup`
    pub startup_dir:  PathBuf,
}

impl StartupShortcutConfig {
    pub const DEFAULT_NAME: &'static str = "SnapTool.lnk";
    pub const DEFAULT_DESCRIPTION: &'static str = "Snap Tool screenshot and annotation utility";
    pub const LAUNCHER: &'static str = "run.bat";

    /// Targets `<install_dir>\run.bat`, starting in `install_dir`
    pub fn for_install_dir(install_dir: &str, startup_dir: impl Into<PathBuf>) -> Self {
        Self {
            name:         Self::DEFAULT_NAME.to_string(),
            target:       windows_join(install_dir, Self::LAUNCHER),
            working_dir:  install_dir.trim_end_matches(['\\', '/']).to_string(),
            window_style: WindowStyle::default(),
            description:  Self::DEFAULT_DESCRIPTION.to_string(),
            arguments:    None,
            startup_dir:  startup_dir.into(),
        }
    }

    pub fn link_path(&self) -> PathBuf {
        self.startup_dir.join(&self.name)
    }

    pub fn validate(&self) -> InstallResult<()> {
        let name_ok = self.name.to_lowercase().ends_with(".lnk")
            && self.name.len() > ".lnk".len()
            && !self.name.contains(['\\', '/']);
        if !name_ok {
            return Err(InstallError::InvalidParameter {
                parameter: "name".to_string(),
                reason:    format!("'{}' is not a .lnk file name", self.name),
            });
        }

        for (parameter, value) in [("target", &self.target), ("working_dir", &self.working_dir)] {
            if !is_drive_absolute(value) {
                return Err(InstallError::InvalidParameter {
                    parameter: parameter.to_string(),
                    reason:    format!("'{value}' is not an absolute drive-letter path"),
                });
            }
        }
        Ok(())
    }

    /// The link these settings describe
    pub fn to_shell_link(&self) -> ShellLink {
        ShellLink {
            target:       self.target.clone(),
            working_dir:  Some(self.working_dir.clone()),
            arguments:    self.arguments.clone().filter(|a| !a.is_empty()),
            description:  Some(self.description.clone()).filter(|d| !d.is_empty()),
            show_command: self.window_style.show_command(),
        }
    }
}

/// Creates, inspects and removes the Startup shortcut
#[derive(Debug, Clone)]
pub struct StartupShortcut {
    config: StartupShortcutConfig,
}

impl StartupShortcut {
    pub fn new(config: StartupShortcutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StartupShortcutConfig {
        &self.config
    }

    /// Writes the shortcut, replacing any existing file of the same name
    pub fn create(&self) -> InstallResult<ShortcutReport> {
        self.config.validate()?;

        if cfg!(target_os = "windows") && !Path::new(&self.config.target).exists() {
            warn!("Shortcut target {} does not exist yet", self.config.target);
        }

        let link = self.config.to_shell_link();
        let bytes = link.to_bytes()?;

        fs::create_dir_all(&self.config.startup_dir)?;
        let path = self.config.link_path();
        write_atomic(&path, &bytes)?;
        info!("Created startup shortcut {}", path.display());

        Ok(report(path, Some(&link)))
    }

    /// Deletes the shortcut if present
    pub fn remove(&self) -> InstallResult<ShortcutReport> {
        let path = self.config.link_path();
        match fs::remove_file(&path) {
            Ok(()) => info!("Removed startup shortcut {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No startup shortcut at {}", path.display());
            }
            Err(e) => return Err(e.into()),
        }
        Ok(report(path, None))
    }

    /// Decodes the existing shortcut, if any
    pub fn inspect(&self) -> InstallResult<Option<ShellLink>> {
        let path = self.config.link_path();
        match fs::read(&path) {
            Ok(bytes) => ShellLink::from_bytes(&bytes).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn status(&self) -> InstallResult<ShortcutReport> {
        let link = self.inspect()?;
        Ok(report(self.config.link_path(), link.as_ref()))
    }
}

fn report(path: PathBuf, link: Option<&ShellLink>) -> ShortcutReport {
    ShortcutReport {
        exists: path.is_file(),
        path,
        target: link.map(|l| l.target.clone()),
        working_dir: link.and_then(|l| l.working_dir.clone()),
        window_style: link.map(|l| WindowStyle::from_show_command(l.show_command)),
    }
}
