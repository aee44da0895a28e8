//! Python interpreter discovery
//!
//! `snap_tool.py` runs under the virtual environment that ships next to it.
//! The LaunchAgent must invoke the venv's interpreter so that site-packages
//! resolve, but macOS privacy permissions (Accessibility, Input Monitoring,
//! Screen Recording) attach to the real executable behind the venv symlink.
//! This module finds both.

use std::{
    env,
    fs,
    path::{Component, Path, PathBuf},
};

use serde::Serialize;
use tracing::debug;

use crate::{
    error::{InstallError, InstallResult},
    util::detect::EnvProvider,
};

/// Virtual-environment directories searched, in order
const VENV_DIRS: [&str; 2] = ["venv", ".venv"];

/// Interpreter names searched inside each venv `bin/`, in order
const VENV_BINARIES: [&str; 2] = ["python3", "python"];

/// Last-resort interpreter
const SYSTEM_PYTHON: &str = "/usr/bin/python3";

/// Where the interpreter path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpreterSource {
    /// `--python` or the config file
    Configured,
    /// A venv inside the install directory
    VirtualEnv,
    /// First `python3` on `$PATH`
    SearchPath,
    /// `/usr/bin/python3`
    SystemDefault,
}

/// A located interpreter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PythonInterpreter {
    /// Path substituted into the LaunchAgent
    pub invocation: PathBuf,
    /// Real executable after following symlinks, if resolvable
    pub resolved:   Option<PathBuf>,
    /// How `invocation` was found
    pub source:     InterpreterSource,
}

impl PythonInterpreter {
    fn new(invocation: PathBuf, source: InterpreterSource) -> Self {
        let resolved = fs::canonicalize(&invocation).ok();
        if resolved.is_none() {
            debug!("Could not resolve interpreter {}", invocation.display());
        }
        Self {
            invocation,
            resolved,
            source,
        }
    }

    /// Whether `invocation` is a symlink to some other file
    pub fn is_symlink(&self) -> bool {
        fs::symlink_metadata(&self.invocation)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    /// Paths to add in System Settings > Privacy & Security
    ///
    /// Framework builds of Python (python.org installers, Homebrew) run the
    /// interpreter from inside `Python.app`, and the privacy database tracks
    /// that bundle, so it is listed alongside the resolved binary.
    pub fn permission_targets(&self) -> Vec<PathBuf> {
        let binary = self.resolved.clone().unwrap_or_else(|| self.invocation.clone());
        let mut targets = vec![binary.clone()];
        if let Some(app) = framework_app_bundle(&binary) {
            targets.push(app);
        }
        targets
    }

    /// Operator-facing instructions for granting macOS privacy permissions
    pub fn permission_guidance(&self) -> Vec<String> {
        let mut lines = vec![
            "snap_tool needs these permissions in System Settings > Privacy & Security:"
                .to_string(),
            "  - Accessibility and Input Monitoring (global hotkey)".to_string(),
            "  - Screen Recording (screen capture)".to_string(),
            "Add the following with the + button in each pane:".to_string(),
        ];
        lines.extend(
            self.permission_targets()
                .iter()
                .map(|p| format!("  {}", p.display())),
        );
        if self.is_symlink() {
            lines.push(format!(
                "({} is a symlink; macOS records the real executable, not the venv path)",
                self.invocation.display()
            ));
        }
        if self.resolved.is_none() {
            lines.push(format!(
                "Could not resolve {}; the path above is a best guess.",
                self.invocation.display()
            ));
        }
        lines
    }
}

/// Finds the interpreter for an installation
///
/// Order: configured path, venv in `install_dir`, `python3` on `$PATH`,
/// `/usr/bin/python3`. A configured path must exist.
pub fn locate_interpreter<E: EnvProvider>(
    install_dir: &Path,
    configured: Option<&Path>,
    env: &E,
) -> InstallResult<PythonInterpreter> {
    if let Some(path) = configured {
        if fs::symlink_metadata(path).is_err() {
            return Err(InstallError::InterpreterNotFound {
                path: path.to_path_buf(),
            });
        }
        return Ok(PythonInterpreter::new(path.to_path_buf(), InterpreterSource::Configured));
    }

    if let Some(path) = find_venv_interpreter(install_dir) {
        debug!("Using venv interpreter {}", path.display());
        return Ok(PythonInterpreter::new(path, InterpreterSource::VirtualEnv));
    }

    if let Some(path) = env("PATH").and_then(|p| search_path(&p, "python3")) {
        debug!("Using interpreter from PATH {}", path.display());
        return Ok(PythonInterpreter::new(path, InterpreterSource::SearchPath));
    }

    Ok(PythonInterpreter::new(
        PathBuf::from(SYSTEM_PYTHON),
        InterpreterSource::SystemDefault,
    ))
}

/// Returns the first venv interpreter entry that exists
///
/// Uses `symlink_metadata` so a dangling venv link still counts; the
/// guidance then reports it as unresolved instead of silently skipping it.
fn find_venv_interpreter(install_dir: &Path) -> Option<PathBuf> {
    VENV_DIRS
        .iter()
        .flat_map(|venv| {
            VENV_BINARIES
                .iter()
                .map(move |bin| install_dir.join(venv).join("bin").join(bin))
        })
        .find(|candidate| fs::symlink_metadata(candidate).is_ok())
}

fn search_path(path_var: &str, binary: &str) -> Option<PathBuf> {
    env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

/// `.../Python.framework/Versions/<v>/...` -> `.../Versions/<v>/Resources/Python.app`
fn framework_app_bundle(binary: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = binary.components().collect();
    let framework = components
        .iter()
        .position(|c| c.as_os_str() == "Python.framework")?;
    if components.get(framework + 1)?.as_os_str() != "Versions" {
        return None;
    }
    components.get(framework + 2)?;

    let version_root: PathBuf = components[..=framework + 2].iter().collect();
    Some(version_root.join("Resources").join("Python.app"))
}
