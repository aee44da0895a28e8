//! Filesystem helpers

use std::{io::Write, path::Path};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{InstallError, InstallResult};

/// Writes `contents` to `path` atomically
///
/// The data goes to a temporary file in the destination directory which is
/// then renamed over `path`, so readers (launchd, Explorer) never observe a
/// partially written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> InstallResult<()> {
    let dir = path.parent().ok_or_else(|| InstallError::InvalidParameter {
        parameter: "path".to_string(),
        reason:    format!("{} has no parent directory", path.display()),
    })?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| InstallError::IoError(e.error))?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.plist");

        write_atomic(&path, b"hello").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.plist");
        std::fs::write(&path, b"old contents that are longer").unwrap();

        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");

        // No stray temp files left behind
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_atomic_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("agent.plist");

        assert!(write_atomic(&path, b"x").is_err());
    }
}
