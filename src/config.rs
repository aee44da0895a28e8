//! Installer configuration file
//!
//! `snap-autostart.toml` is optional. It is read from `--config`, or from the
//! install directory when present. Every key is optional and command-line
//! flags take precedence.
//!
//! ```toml
//! [launch_agent]
//! label = "com.snaptools.snaptool"
//! template = "launchd/snaptool.plist.template"   # relative to the install dir
//! python = "/opt/homebrew/bin/python3"
//!
//! [startup_shortcut]
//! name = "SnapTool.lnk"
//! target = 'D:\dev\snap_tools\run.bat'
//! working_dir = 'D:\dev\snap_tools'
//! window_style = "minimized"
//! description = "Snap Tool"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{InstallError, InstallResult},
    launchd::LaunchAgentConfig,
    model::WindowStyle,
    shortcut::StartupShortcutConfig,
    util::detect::{EnvProvider, launch_agents_dir, startup_dir},
};

/// File name probed in the install directory
pub const CONFIG_FILE_NAME: &str = "snap-autostart.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    pub launch_agent:     LaunchAgentSection,
    pub startup_shortcut: StartupShortcutSection,
}

/// `[launch_agent]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LaunchAgentSection {
    pub label:      Option<String>,
    pub template:   Option<PathBuf>,
    pub python:     Option<PathBuf>,
    pub agents_dir: Option<PathBuf>,
}

/// `[startup_shortcut]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StartupShortcutSection {
    pub name:         Option<String>,
    pub target:       Option<String>,
    pub working_dir:  Option<String>,
    pub window_style: Option<WindowStyle>,
    pub description:  Option<String>,
    pub arguments:    Option<String>,
    pub startup_dir:  Option<PathBuf>,
}

impl InstallerConfig {
    /// Loads `explicit`, else `<install_dir>/snap-autostart.toml`, else defaults
    ///
    /// Also returns the file that was read, if any.
    pub fn load(
        explicit: Option<&Path>,
        install_dir: &Path,
    ) -> InstallResult<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let local = install_dir.join(CONFIG_FILE_NAME);
                if !local.is_file() {
                    debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, install_dir.display());
                    return Ok((Self::default(), None));
                }
                local
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| InstallError::Config {
            path:   path.clone(),
            reason: e.to_string(),
        })?;
        let config = Self::parse(&content, &path)?;
        debug!("Loaded configuration from {}", path.display());
        Ok((config, Some(path)))
    }

    pub fn parse(content: &str, path: &Path) -> InstallResult<Self> {
        toml::from_str(content).map_err(|e| InstallError::Config {
            path:   path.to_path_buf(),
            reason: e.message().to_string(),
        })
    }

    /// Command-line values replace file values
    ///
    /// Relative command-line paths are taken relative to `cwd`, unlike file
    /// values which are relative to the install directory.
    pub fn apply_overrides(
        &mut self,
        python: Option<PathBuf>,
        template: Option<PathBuf>,
        cwd: &Path,
    ) {
        if let Some(python) = python {
            self.launch_agent.python = Some(cwd.join(python));
        }
        if let Some(template) = template {
            self.launch_agent.template = Some(cwd.join(template));
        }
    }

    /// Builds the LaunchAgent settings
    ///
    /// Relative `template` and `python` paths are taken relative to
    /// `install_dir`.
    pub fn launch_agent_config<E: EnvProvider>(
        &self,
        install_dir: &Path,
        env: &E,
    ) -> InstallResult<LaunchAgentConfig> {
        let section = &self.launch_agent;
        let agents_dir = match &section.agents_dir {
            Some(dir) => dir.clone(),
            None => launch_agents_dir(env)?,
        };

        let mut config = LaunchAgentConfig::new(install_dir, agents_dir)
            .with_template(section.template.as_ref().map(|p| install_dir.join(p)))
            .with_python(section.python.as_ref().map(|p| install_dir.join(p)));
        if let Some(label) = &section.label {
            config = config.with_label(label.clone());
        }
        Ok(config)
    }

    /// Builds the Startup shortcut settings
    pub fn startup_shortcut_config<E: EnvProvider>(
        &self,
        install_dir: &Path,
        env: &E,
    ) -> InstallResult<StartupShortcutConfig> {
        let section = &self.startup_shortcut;
        let startup = match &section.startup_dir {
            Some(dir) => dir.clone(),
            None => startup_dir(env)?,
        };

        let mut config =
            StartupShortcutConfig::for_install_dir(&install_dir.to_string_lossy(), startup);
        if let Some(name) = &section.name {
            config.name = name.clone();
        }
        if let Some(target) = &section.target {
            config.target = target.clone();
        }
        if let Some(working_dir) = &section.working_dir {
            config.working_dir = working_dir.clone();
        }
        if let Some(style) = section.window_style {
            config.window_style = style;
        }
        if let Some(description) = &section.description {
            config.description = description.clone();
        }
        if section.arguments.is_some() {
            config.arguments = section.arguments.clone();
        }
        Ok(config)
    }
}
