//! Shared test utilities for the installer integration tests

#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use snap_autostart::{
    interpreter::{InterpreterSource, PythonInterpreter},
    launchd::{LaunchAgent, LaunchAgentConfig},
};
use tempfile::TempDir;

/// A throwaway snap_tools checkout plus a fake `~/Library/LaunchAgents`
pub struct InstallFixture {
    root: TempDir,
}

impl InstallFixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(root.path().join("snap_tools")).expect("create install dir");
        fs::write(root.path().join("snap_tools/snap_tool.py"), "print('snap')\n")
            .expect("write snap_tool.py");
        Self { root }
    }

    pub fn install_dir(&self) -> PathBuf {
        self.root.path().join("snap_tools")
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.root.path().join("Library/LaunchAgents")
    }

    pub fn startup_dir(&self) -> PathBuf {
        self.root.path().join("Startup")
    }

    /// Creates `venv/bin/python3` inside the install dir
    pub fn with_venv(self) -> Self {
        let bin = self.install_dir().join("venv/bin");
        fs::create_dir_all(&bin).expect("create venv bin");
        fs::write(bin.join("python3"), "").expect("write venv python");
        self
    }

    /// Writes a template file into the install dir and returns its path
    pub fn write_template(&self, name: &str, content: &str) -> PathBuf {
        let path = self.install_dir().join(name);
        fs::write(&path, content).expect("write template");
        path
    }

    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.install_dir().join("snap-autostart.toml");
        fs::write(&path, content).expect("write config");
        path
    }

    /// A LaunchAgent using the bundled template and a fixed interpreter
    pub fn agent(&self) -> LaunchAgent {
        LaunchAgent::new(
            LaunchAgentConfig::new(self.install_dir(), self.agents_dir()),
            python("/opt/snap/venv/bin/python3"),
        )
    }
}

pub fn python(path: &str) -> PythonInterpreter {
    PythonInterpreter {
        invocation: PathBuf::from(path),
        resolved:   None,
        source:     InterpreterSource::Configured,
    }
}

/// Every `.plist` file in `dir`
pub fn plist_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "plist"))
        .collect();
    files.sort();
    files
}
