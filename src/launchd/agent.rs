use std::{fs, path::Path, sync::LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};

use super::{LaunchAgentConfig, ServiceManager, TemplateSource};
use crate::{
    error::{InstallError, InstallResult},
    interpreter::PythonInterpreter,
    model::{AgentInstallReport, AgentStatusReport, AgentUninstallReport},
    template::{Placeholder, Substitutions, render, validate_plist},
    util::fs::write_atomic,
};

/// Default property-list template shipped with the installer
pub const BUNDLED_TEMPLATE: &str =
    include_str!("../../templates/com.snaptools.snaptool.plist.template");

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<key>\s*Label\s*</key>\s*<string>\s*([^<]*?)\s*</string>")
        .expect("label regex is valid")
});

/// Returns the value of the top-level `Label` key, if present
pub fn extract_label(plist: &str) -> Option<String> {
    LABEL_RE
        .captures(plist)
        .map(|c| c[1].to_string())
        .filter(|label| !label.is_empty())
}

/// The snap_tool LaunchAgent
///
/// Combines the configuration with the interpreter that `__PYTHON_PATH__`
/// resolves to. Rendering is pure; `install` goes through a
/// [`ServiceManager`]. Removal and status only need the configuration, see
/// [`uninstall_agent`] and [`agent_status`].
#[derive(Debug, Clone)]
pub struct LaunchAgent {
    config:      LaunchAgentConfig,
    interpreter: PythonInterpreter,
}

impl LaunchAgent {
    pub fn new(config: LaunchAgentConfig, interpreter: PythonInterpreter) -> Self {
        Self {
            config,
            interpreter,
        }
    }

    pub fn config(&self) -> &LaunchAgentConfig {
        &self.config
    }

    pub fn interpreter(&self) -> &PythonInterpreter {
        &self.interpreter
    }

    /// Renders the property list that `install` would write
    ///
    /// Fails if the template is missing, leaves placeholders behind, lacks a
    /// `<plist>` root or declares a label other than the configured one.
    pub fn render(&self) -> InstallResult<String> {
        let source = self.config.template_source()?;
        debug!("Rendering LaunchAgent from {}", source);
        let template = LaunchAgentConfig::read_template(&source, BUNDLED_TEMPLATE)?;

        let substitutions = Substitutions::new()
            .set_path(Placeholder::InstallPath, &self.config.install_dir)
            .set_path(Placeholder::PythonPath, &self.interpreter.invocation);
        validate_plist(&template, &substitutions)?;
        let rendered = render(&template, &substitutions);

        match extract_label(&rendered) {
            None => Err(InstallError::InvalidTemplate {
                reason: format!("{source} has no Label key"),
            }),
            Some(found) if found != self.config.label => Err(InstallError::LabelMismatch {
                expected: self.config.label.clone(),
                found,
            }),
            Some(_) => Ok(rendered),
        }
    }

    /// Writes the plist into LaunchAgents and loads it
    ///
    /// A previous registration is unloaded first, with failures ignored, so
    /// running the installer repeatedly leaves exactly one loaded agent.
    pub async fn install(&self, manager: &dyn ServiceManager) -> InstallResult<AgentInstallReport> {
        self.config.validate()?;
        let plist_path = self.config.plist_path();

        // Render before touching launchd so a bad template leaves the old
        // registration in place.
        let rendered = self.render()?;

        fs::create_dir_all(&self.config.agents_dir)?;

        let replaced_previous = plist_path.exists();
        if replaced_previous {
            info!("Unloading previous LaunchAgent {}", self.config.label);
            if let Err(e) = manager.unload(&plist_path).await {
                debug!("Ignoring unload failure: {}", e);
            }
        }

        write_atomic(&plist_path, rendered.as_bytes())?;
        info!("Wrote {}", plist_path.display());

        manager.load(&plist_path).await?;
        info!("Loaded LaunchAgent {}", self.config.label);

        Ok(AgentInstallReport {
            label: self.config.label.clone(),
            plist_path,
            python_path: self.interpreter.invocation.clone(),
            resolved_python: self.interpreter.resolved.clone(),
            replaced_previous,
        })
    }

    /// Whether the bundled template is in use
    pub fn uses_bundled_template(&self) -> InstallResult<bool> {
        Ok(self.config.template_source()? == TemplateSource::Bundled)
    }
}

/// Unloads the agent described by `config` and deletes its plist
///
/// Needs no interpreter, so it still works once the venv is gone.
pub async fn uninstall_agent(
    config: &LaunchAgentConfig,
    manager: &dyn ServiceManager,
) -> InstallResult<AgentUninstallReport> {
    config.validate()?;
    let plist_path = config.plist_path();

    let removed = if plist_path.exists() {
        if let Err(e) = manager.unload(&plist_path).await {
            warn!("Unload of {} failed: {}", config.label, e);
        }
        remove_if_present(&plist_path)?;
        info!("Removed {}", plist_path.display());
        true
    } else {
        info!("No LaunchAgent installed at {}", plist_path.display());
        false
    };

    Ok(AgentUninstallReport {
        label: config.label.clone(),
        plist_path,
        removed,
    })
}

/// Reports plist presence and launchd state for `config`
pub async fn agent_status(
    config: &LaunchAgentConfig,
    manager: &dyn ServiceManager,
) -> InstallResult<AgentStatusReport> {
    config.validate()?;
    let plist_path = config.plist_path();
    let status = manager.status(&config.label).await?;

    Ok(AgentStatusReport {
        label: config.label.clone(),
        plist_exists: plist_path.exists(),
        plist_path,
        status,
    })
}

fn remove_if_present(path: &Path) -> InstallResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{interpreter::InterpreterSource, launchd::MockServiceManager};

    fn interpreter(path: &str) -> PythonInterpreter {
        PythonInterpreter {
            invocation: PathBuf::from(path),
            resolved:   None,
            source:     InterpreterSource::Configured,
        }
    }

    fn agent(install_dir: &Path, agents_dir: &Path) -> LaunchAgent {
        LaunchAgent::new(
            LaunchAgentConfig::new(install_dir, agents_dir),
            interpreter("/opt/snap/venv/bin/python3"),
        )
    }

    #[test]
    fn test_extract_label() {
        assert_eq!(
            extract_label(BUNDLED_TEMPLATE),
            Some(LaunchAgentConfig::DEFAULT_LABEL.to_string())
        );
        assert_eq!(
            extract_label("<key>Label</key>\n  <string> com.x </string>"),
            Some("com.x".to_string())
        );
        assert_eq!(extract_label("<key>Label</key><string></string>"), None);
        assert_eq!(extract_label("<dict></dict>"), None);
    }

    #[test]
    fn test_bundled_template_has_both_placeholders() {
        for placeholder in Placeholder::ALL {
            assert!(BUNDLED_TEMPLATE.contains(placeholder.token()));
        }
    }

    #[test]
    fn test_render_bundled_template() {
        let install = tempfile::tempdir().unwrap();
        let rendered = agent(install.path(), Path::new("/tmp/agents")).render().unwrap();

        let install_str = install.path().to_string_lossy();
        assert!(rendered.contains(&format!("<string>{install_str}/snap_tool.py</string>")));
        assert!(rendered.contains(&format!("<string>{install_str}</string>")));
        assert!(rendered.contains("<string>/opt/snap/venv/bin/python3</string>"));
        assert!(!rendered.contains("__"));
    }

    #[test]
    fn test_render_rejects_label_mismatch() {
        let install = tempfile::tempdir().unwrap();
        let mut a = agent(install.path(), Path::new("/tmp/agents"));
        a.config = a.config.clone().with_label("org.other.label");

        match a.render().unwrap_err() {
            InstallError::LabelMismatch { expected, found } => {
                assert_eq!(expected, "org.other.label");
                assert_eq!(found, LaunchAgentConfig::DEFAULT_LABEL);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_render_rejects_unknown_placeholder() {
        let install = tempfile::tempdir().unwrap();
        fs::write(
            install.path().join(LaunchAgentConfig::TEMPLATE_FILE_NAME),
            "<plist><dict><key>Label</key><string>com.snaptools.snaptool</string>\
             <string>__HOME_DIR__</string></dict></plist>",
        )
        .unwrap();

        let err = agent(install.path(), Path::new("/tmp/agents")).render().unwrap_err();
        assert!(matches!(err, InstallError::UnresolvedPlaceholders { .. }));
    }

    #[test]
    fn test_render_rejects_template_without_label() {
        let install = tempfile::tempdir().unwrap();
        fs::write(
            install.path().join(LaunchAgentConfig::TEMPLATE_FILE_NAME),
            "<plist><dict><key>RunAtLoad</key><true/></dict></plist>",
        )
        .unwrap();

        let err = agent(install.path(), Path::new("/tmp/agents")).render().unwrap_err();
        assert!(matches!(err, InstallError::InvalidTemplate { .. }));
    }

    #[tokio::test]
    async fn test_install_creates_agents_dir_and_loads() {
        let install = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let agents_dir = home.path().join("Library/LaunchAgents");
        let manager = MockServiceManager::new();

        let report = agent(install.path(), &agents_dir).install(&manager).await.unwrap();

        assert!(agents_dir.is_dir());
        assert!(report.plist_path.is_file());
        assert!(!report.replaced_previous);
        assert_eq!(manager.loaded_labels(), vec![LaunchAgentConfig::DEFAULT_LABEL]);
    }

    #[tokio::test]
    async fn test_failed_render_keeps_previous_registration() {
        let install = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let manager = MockServiceManager::new();
        let good = agent(install.path(), home.path());
        good.install(&manager).await.unwrap();

        let broken = LaunchAgent::new(
            good.config().clone().with_template(Some(install.path().join("gone.plist"))),
            good.interpreter().clone(),
        );
        assert!(broken.install(&manager).await.is_err());
        assert_eq!(manager.loaded_labels().len(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_is_reported() {
        let install = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let manager = MockServiceManager::new().with_load_error("Load failed: 5");

        let err = agent(install.path(), home.path()).install(&manager).await.unwrap_err();
        assert!(matches!(err, InstallError::ServiceCommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_uninstall_without_plist() {
        let install = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let manager = MockServiceManager::new();

        let a = agent(install.path(), home.path());
        let report = uninstall_agent(a.config(), &manager).await.unwrap();
        assert!(!report.removed);
        assert!(manager.calls().is_empty());
    }
}
