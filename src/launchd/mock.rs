//! In-memory service manager for testing
//!
//! `MockServiceManager` mimics the parts of launchd the installer relies on
//! without touching the real system:
//!
//! - loading reads the plist and registers its `Label`
//! - loading a label that is already registered fails, like launchd does
//! - unloading an unknown plist fails
//! - every call is recorded for later assertions
//!
//! # Examples
//!
//! ```
//! use std::path::Path;
//!
//! use snap_autostart::launchd::{MockServiceManager, ServiceManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = MockServiceManager::new();
//!     let status = manager.status("com.snaptools.snaptool").await.unwrap();
//!     assert!(!status.is_loaded());
//!
//!     let err = manager.unload(Path::new("/tmp/missing.plist")).await;
//!     assert!(err.is_err());
//! }
//! ```

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::{ServiceManager, agent::extract_label};
use crate::{
    error::{InstallError, InstallResult},
    model::LaunchAgentStatus,
};

/// A call received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    Load(PathBuf),
    Unload(PathBuf),
    Status(String),
}

/// Mock launchd for tests and dry runs
#[derive(Debug, Default)]
pub struct MockServiceManager {
    /// plist path -> label
    loaded:     Mutex<BTreeMap<PathBuf, String>>,
    calls:      Mutex<Vec<ServiceCall>>,
    /// stderr text returned by every `load` when set
    load_error: Option<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `load` fail with `stderr`
    pub fn with_load_error(mut self, stderr: impl Into<String>) -> Self {
        self.load_error = Some(stderr.into());
        self
    }

    /// Labels currently registered
    pub fn loaded_labels(&self) -> Vec<String> {
        lock(&self.loaded).values().cloned().collect()
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<ServiceCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: ServiceCall) {
        lock(&self.calls).push(call);
    }

    fn failure(verb: &str, target: &Path, stderr: impl Into<String>) -> InstallError {
        InstallError::ServiceCommandFailed {
            command: format!("launchctl {} {}", verb, target.display()),
            code:    Some(5),
            stderr:  stderr.into(),
        }
    }
}

#[async_trait]
impl ServiceManager for MockServiceManager {
    async fn load(&self, plist: &Path) -> InstallResult<()> {
        self.record(ServiceCall::Load(plist.to_path_buf()));

        if let Some(stderr) = &self.load_error {
            return Err(Self::failure("load", plist, stderr.clone()));
        }

        let contents = fs::read_to_string(plist)
            .map_err(|e| Self::failure("load", plist, format!("Load failed: {e}")))?;
        let label = extract_label(&contents)
            .ok_or_else(|| Self::failure("load", plist, "Load failed: missing Label"))?;

        let mut loaded = lock(&self.loaded);
        if loaded.values().any(|l| *l == label) {
            return Err(Self::failure(
                "load",
                plist,
                "Load failed: 5: Input/output error (service already loaded)",
            ));
        }
        loaded.insert(plist.to_path_buf(), label);
        Ok(())
    }

    async fn unload(&self, plist: &Path) -> InstallResult<()> {
        self.record(ServiceCall::Unload(plist.to_path_buf()));

        match lock(&self.loaded).remove(plist) {
            Some(_) => Ok(()),
            None => Err(Self::failure(
                "unload",
                plist,
                "Unload failed: 113: Could not find specified service",
            )),
        }
    }

    async fn status(&self, label: &str) -> InstallResult<LaunchAgentStatus> {
        self.record(ServiceCall::Status(label.to_string()));

        let loaded = lock(&self.loaded);
        if loaded.values().any(|l| l == label) {
            Ok(LaunchAgentStatus::Loaded {
                pid:              None,
                last_exit_status: Some(0),
            })
        } else {
            Ok(LaunchAgentStatus::NotLoaded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_plist(dir: &Path, label: &str) -> PathBuf {
        let path = dir.join(format!("{label}.plist"));
        fs::write(
            &path,
            format!("<plist><dict><key>Label</key><string>{label}</string></dict></plist>"),
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_then_status() {
        let dir = tempfile::tempdir().unwrap();
        let plist = write_plist(dir.path(), "com.example.a");
        let manager = MockServiceManager::new();

        manager.load(&plist).await.unwrap();
        assert!(manager.status("com.example.a").await.unwrap().is_loaded());
        assert_eq!(manager.loaded_labels(), vec!["com.example.a".to_string()]);
    }

    #[tokio::test]
    async fn test_double_load_fails() {
        let dir = tempfile::tempdir().unwrap();
        let plist = write_plist(dir.path(), "com.example.a");
        let manager = MockServiceManager::new();

        manager.load(&plist).await.unwrap();
        let err = manager.load(&plist).await.unwrap_err();
        assert!(err.to_string().contains("already loaded"));
    }

    #[tokio::test]
    async fn test_unload_unknown_fails() {
        let manager = MockServiceManager::new();
        let err = manager.unload(Path::new("/tmp/none.plist")).await.unwrap_err();
        assert!(err.to_string().contains("Could not find"));
    }

    #[tokio::test]
    async fn test_load_error_injection() {
        let dir = tempfile::tempdir().unwrap();
        let plist = write_plist(dir.path(), "com.example.a");
        let manager = MockServiceManager::new().with_load_error("Load failed: 134");

        assert!(manager.load(&plist).await.is_err());
        assert!(manager.loaded_labels().is_empty());
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let plist = write_plist(dir.path(), "com.example.a");
        let manager = MockServiceManager::new();

        manager.load(&plist).await.unwrap();
        manager.status("com.example.a").await.unwrap();
        manager.unload(&plist).await.unwrap();

        assert_eq!(
            manager.calls(),
            vec![
                ServiceCall::Load(plist.clone()),
                ServiceCall::Status("com.example.a".to_string()),
                ServiceCall::Unload(plist),
            ]
        );
    }
}
