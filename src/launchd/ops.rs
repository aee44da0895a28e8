use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Output,
    sync::LazyLock,
};

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::{
    error::{InstallError, InstallResult},
    model::LaunchAgentStatus,
};

static PID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""PID"\s*=\s*(\d+);"#).expect("pid regex is valid"));

static LAST_EXIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""LastExitStatus"\s*=\s*(-?\d+);"#).expect("exit status regex is valid")
});

/// Interface to the OS service manager (launchd)
///
/// All implementations must be thread-safe (`Send + Sync`) so a single
/// manager can be shared behind an `Arc`.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Registers the job described by `plist`
    async fn load(&self, plist: &Path) -> InstallResult<()>;

    /// Deregisters the job described by `plist`
    async fn unload(&self, plist: &Path) -> InstallResult<()>;

    /// Reports whether a job with `label` is loaded
    async fn status(&self, label: &str) -> InstallResult<LaunchAgentStatus>;
}

/// [`ServiceManager`] backed by the `launchctl` command
#[derive(Debug, Clone)]
pub struct Launchctl {
    program: PathBuf,
}

impl Default for Launchctl {
    fn default() -> Self {
        Self::new()
    }
}

impl Launchctl {
    pub fn new() -> Self {
        Self::with_program("launchctl")
    }

    /// Uses a different executable, e.g. an absolute path or a test double
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command_line(&self, args: &[&OsStr]) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(args.iter().copied())
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn run(&self, args: &[&OsStr]) -> InstallResult<Output> {
        let command = self.command_line(args);
        debug!("Running {}", command);

        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| InstallError::ServiceCommandFailed {
                command: command.clone(),
                code:    None,
                stderr:  e.to_string(),
            })?;

        debug!("{} exited with {:?}", command, output.status.code());
        Ok(output)
    }

    fn failure(&self, args: &[&OsStr], output: &Output) -> InstallError {
        InstallError::ServiceCommandFailed {
            command: self.command_line(args),
            code:    output.status.code(),
            stderr:  String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

/// `launchctl load` can exit 0 and still report a failure on stderr
fn reports_failure(stderr: &[u8]) -> bool {
    let stderr = String::from_utf8_lossy(stderr).to_lowercase();
    stderr.contains("load failed") || stderr.contains("unload failed")
}

#[async_trait]
impl ServiceManager for Launchctl {
    async fn load(&self, plist: &Path) -> InstallResult<()> {
        let args = [OsStr::new("load"), plist.as_os_str()];
        let output = self.run(&args).await?;
        if !output.status.success() || reports_failure(&output.stderr) {
            return Err(self.failure(&args, &output));
        }
        Ok(())
    }

    async fn unload(&self, plist: &Path) -> InstallResult<()> {
        let args = [OsStr::new("unload"), plist.as_os_str()];
        let output = self.run(&args).await?;
        if !output.status.success() || reports_failure(&output.stderr) {
            return Err(self.failure(&args, &output));
        }
        Ok(())
    }

    async fn status(&self, label: &str) -> InstallResult<LaunchAgentStatus> {
        let args = [OsStr::new("list"), OsStr::new(label)];
        let output = self.run(&args).await?;
        // Unknown labels exit non-zero ("Could not find service").
        if !output.status.success() {
            return Ok(LaunchAgentStatus::NotLoaded);
        }
        Ok(parse_list_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses the dictionary printed by `launchctl list <label>`
pub fn parse_list_output(stdout: &str) -> LaunchAgentStatus {
    let pid = PID_RE
        .captures(stdout)
        .and_then(|c| c[1].parse::<u32>().ok());
    let last_exit_status = LAST_EXIT_RE
        .captures(stdout)
        .and_then(|c| c[1].parse::<i32>().ok());

    LaunchAgentStatus::Loaded {
        pid,
        last_exit_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNNING: &str = r#"{
	"LimitLoadToSessionType" = "Aqua";
	"Label" = "com.snaptools.snaptool";
	"OnDemand" = true;
	"LastExitStatus" = 0;
	"PID" = 48213;
	"Program" = "/Users/me/snap_tools/venv/bin/python3";
};"#;

    const CRASHED: &str = r#"{
	"Label" = "com.snaptools.snaptool";
	"LastExitStatus" = -9;
};"#;

    #[test]
    fn test_parse_running_job() {
        assert_eq!(
            parse_list_output(RUNNING),
            LaunchAgentStatus::Loaded {
                pid:              Some(48213),
                last_exit_status: Some(0),
            }
        );
    }

    #[test]
    fn test_parse_job_without_pid() {
        assert_eq!(
            parse_list_output(CRASHED),
            LaunchAgentStatus::Loaded {
                pid:              None,
                last_exit_status: Some(-9),
            }
        );
    }

    #[test]
    fn test_reports_failure() {
        assert!(reports_failure(b"Load failed: 5: Input/output error\n"));
        assert!(reports_failure(b"Unload failed: 113: Could not find specified service"));
        assert!(!reports_failure(b""));
    }

    #[test]
    fn test_command_line_formatting() {
        let launchctl = Launchctl::new();
        let line =
            launchctl.command_line(&[OsStr::new("load"), OsStr::new("/tmp/com.x.plist")]);
        assert_eq!(line, "launchctl load /tmp/com.x.plist");
    }

    /// Writes an executable shell script standing in for launchctl
    #[cfg(unix)]
    fn stub_launchctl(dir: &Path, body: &str) -> Launchctl {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("launchctl");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Launchctl::with_program(path)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_load_failed_on_stderr_with_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let launchctl = stub_launchctl(
            dir.path(),
            "echo 'Load failed: 5: Input/output error' >&2\nexit 0",
        );

        match launchctl.load(Path::new("/tmp/x.plist")).await.unwrap_err() {
            InstallError::ServiceCommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(0));
                assert_eq!(stderr, "Load failed: 5: Input/output error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_load_and_unload() {
        let dir = tempfile::tempdir().unwrap();
        let launchctl = stub_launchctl(
            dir.path(),
            "case \"$1\" in load|unload) exit 0 ;; *) exit 2 ;; esac",
        );

        assert!(launchctl.load(Path::new("/tmp/x.plist")).await.is_ok());
        assert!(launchctl.unload(Path::new("/tmp/x.plist")).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unload_nonzero_exit_is_a_service_error() {
        let dir = tempfile::tempdir().unwrap();
        let launchctl = stub_launchctl(dir.path(), "echo 'No such file' >&2\nexit 3");

        let err = launchctl.unload(Path::new("/tmp/x.plist")).await.unwrap_err();
        assert!(matches!(
            err,
            InstallError::ServiceCommandFailed { code: Some(3), .. }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_nonzero_exit_is_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let launchctl = stub_launchctl(
            dir.path(),
            "echo 'Could not find service \"com.snaptools.snaptool\" in domain' >&2\nexit 113",
        );

        let status = launchctl.status("com.snaptools.snaptool").await.unwrap();
        assert_eq!(status, LaunchAgentStatus::NotLoaded);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_dictionary_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!(
            "[ \"$1\" = list ] && [ \"$2\" = com.snaptools.snaptool ] || exit 2\ncat <<'EOF'\n{RUNNING}\nEOF"
        );
        let launchctl = stub_launchctl(dir.path(), &script);

        let status = launchctl.status("com.snaptools.snaptool").await.unwrap();
        assert_eq!(
            status,
            LaunchAgentStatus::Loaded {
                pid:              Some(48213),
                last_exit_status: Some(0),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_a_service_error() {
        let launchctl = Launchctl::with_program("/nonexistent/launchctl-for-tests");
        let err = launchctl.load(Path::new("/tmp/x.plist")).await.unwrap_err();

        match err {
            InstallError::ServiceCommandFailed { command, code, .. } => {
                assert!(command.contains("load /tmp/x.plist"));
                assert_eq!(code, None);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
