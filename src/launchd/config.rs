use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{InstallError, InstallResult};

/// Where a LaunchAgent template is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// A template file on disk
    File(PathBuf),
    /// The template compiled into the binary
    Bundled,
}

impl std::fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateSource::File(path) => write!(f, "{}", path.display()),
            TemplateSource::Bundled => write!(f, "bundled template"),
        }
    }
}

/// Settings for the snap_tool LaunchAgent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchAgentConfig {
    /// launchd label; also the plist file stem
    pub label:       String,
    /// snap_tools checkout substituted for `__INSTALL_PATH__`
    pub install_dir: PathBuf,
    /// Explicit template file
    pub template:    Option<PathBuf>,
    /// Explicit interpreter for `__PYTHON_PATH__`
    pub python:      Option<PathBuf>,
    /// Per-user LaunchAgents directory
    pub agents_dir:  PathBuf,
}

impl LaunchAgentConfig {
    pub const DEFAULT_LABEL: &'static str = "com.snaptools.snaptool";

    /// File name probed in the install directory when no template is set
    pub const TEMPLATE_FILE_NAME: &'static str = "com.snaptools.snaptool.plist.template";

    pub fn new(install_dir: impl Into<PathBuf>, agents_dir: impl Into<PathBuf>) -> Self {
        Self {
            label:       Self::DEFAULT_LABEL.to_string(),
            install_dir: install_dir.into(),
            template:    None,
            python:      None,
            agents_dir:  agents_dir.into(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_template(mut self, template: Option<PathBuf>) -> Self {
        self.template = template;
        self
    }

    pub fn with_python(mut self, python: Option<PathBuf>) -> Self {
        self.python = python;
        self
    }

    /// `<agents_dir>/<label>.plist`
    pub fn plist_path(&self) -> PathBuf {
        self.agents_dir.join(format!("{}.plist", self.label))
    }

    /// Rejects labels launchd or the filesystem would choke on
    pub fn validate(&self) -> InstallResult<()> {
        let label = self.label.as_str();
        let invalid = |reason: &str| InstallError::InvalidParameter {
            parameter: "label".to_string(),
            reason:    format!("'{label}' {reason}"),
        };

        if label.is_empty() {
            return Err(invalid("is empty"));
        }
        if label.contains(['/', '\\']) || label.chars().any(char::is_whitespace) {
            return Err(invalid("must not contain path separators or whitespace"));
        }
        if label.starts_with('.') {
            return Err(invalid("must not start with '.'"));
        }
        Ok(())
    }

    /// Picks the template: explicit file, then the install directory, then
    /// the bundled default
    pub fn template_source(&self) -> InstallResult<TemplateSource> {
        if let Some(path) = &self.template {
            if !path.is_file() {
                return Err(InstallError::TemplateNotFound { path: path.clone() });
            }
            return Ok(TemplateSource::File(path.clone()));
        }

        let local = self.install_dir.join(Self::TEMPLATE_FILE_NAME);
        if local.is_file() {
            return Ok(TemplateSource::File(local));
        }

        Ok(TemplateSource::Bundled)
    }

    pub(crate) fn read_template(source: &TemplateSource, bundled: &str) -> InstallResult<String> {
        match source {
            TemplateSource::File(path) => read_file(path),
            TemplateSource::Bundled => Ok(bundled.to_string()),
        }
    }
}

fn read_file(path: &Path) -> InstallResult<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => InstallError::TemplateNotFound {
            path: path.to_path_buf(),
        },
        _ => InstallError::IoError(e),
    })
}
