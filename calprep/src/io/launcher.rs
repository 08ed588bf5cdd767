//! Launch seam between run orchestration and the operating system.
//!
//! [`ProcessLauncher`] decouples the job runner from real process spawning;
//! tests drive the orchestration with scripted launchers that return
//! predetermined outputs without starting processes.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::io::process::{CommandOutput, ProcessError, run_command};

/// Everything needed to start one child process.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Interpreter executable name or path.
    pub program: String,
    /// Arguments in contract order.
    pub args: Vec<OsString>,
    /// Working directory for the child.
    pub cwd: PathBuf,
    /// Kill the child after this long.
    pub timeout: Duration,
    /// Per-stream capture limit in bytes.
    pub output_limit_bytes: usize,
}

/// Abstraction over child process execution.
pub trait ProcessLauncher {
    /// Start the process described by `spec` and wait for its outcome.
    fn launch(&self, spec: &LaunchSpec) -> Result<CommandOutput, ProcessError>;
}

/// Launcher that spawns real processes.
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<CommandOutput, ProcessError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).current_dir(&spec.cwd);
        run_command(cmd, spec.timeout, spec.output_limit_bytes)
    }
}

/// Captured streams destined for a run log file.
#[derive(Debug)]
pub struct RunLog<'a> {
    pub stdout: &'a str,
    pub stderr: &'a str,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

/// Write both captured streams to `path` as a sectioned text log.
pub fn write_run_log(path: &Path, log: &RunLog<'_>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log dir {}", parent.display()))?;
    }
    let mut buf = String::new();
    buf.push_str("=== stdout ===\n");
    buf.push_str(log.stdout);
    if log.stdout_truncated > 0 {
        buf.push_str(&format!(
            "\n[stdout truncated {} bytes]\n",
            log.stdout_truncated
        ));
    }
    buf.push_str("\n=== stderr ===\n");
    buf.push_str(log.stderr);
    if log.stderr_truncated > 0 {
        buf.push_str(&format!(
            "\n[stderr truncated {} bytes]\n",
            log.stderr_truncated
        ));
    }
    if log.timed_out {
        buf.push_str("\n[run timed out]\n");
    }
    fs::write(path, buf).with_context(|| format!("write run log {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn system_launcher_runs_in_the_given_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cwd = temp.path().canonicalize().expect("canonicalize");

        let spec = LaunchSpec {
            program: "sh".to_string(),
            args: vec!["-c".into(), "pwd".into()],
            cwd: cwd.clone(),
            timeout: Duration::from_secs(10),
            output_limit_bytes: 4096,
        };
        let output = SystemLauncher.launch(&spec).expect("launch");

        assert!(output.success());
        assert_eq!(
            String::from_utf8_lossy(&output.stdout).trim(),
            cwd.display().to_string()
        );
    }

    #[test]
    fn run_log_is_sectioned_and_notes_truncation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("logs").join("run.log");

        write_run_log(
            &path,
            &RunLog {
                stdout: "prepared\n",
                stderr: "",
                stdout_truncated: 0,
                stderr_truncated: 42,
                timed_out: true,
            },
        )
        .expect("write log");

        let text = fs::read_to_string(&path).expect("read log");
        assert!(text.starts_with("=== stdout ===\nprepared\n"));
        assert!(text.contains("=== stderr ==="));
        assert!(text.contains("[stderr truncated 42 bytes]"));
        assert!(text.contains("[run timed out]"));
    }
}
