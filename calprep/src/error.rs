//! Typed errors for the preparation run.
//!
//! Callers branch on the variant rather than parsing message text; the CLI
//! maps each kind to a stable exit code.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::core::selection::{RunInputs, SelectionField};

/// Everything that can go wrong between "run requested" and a classified
/// outcome.
#[derive(Debug, Error)]
pub enum RunError {
    /// One or more of the four required inputs is absent.
    #[error("missing required inputs: {}", join_labels(.0))]
    MissingSelection(Vec<SelectionField>),

    /// An upper-air path contains the `;` list separator and cannot travel
    /// through the joined argument.
    #[error(
        "upper-air path contains the ';' list separator: {}\n\
         rename the file or move it to a path without ';'",
        .0.display()
    )]
    UnencodablePath(PathBuf),

    /// The companion script is absent at its resolved location.
    #[error(
        "transformation script not found: {}\n\
         deploy the script next to the executable or set script.path in the config",
        .0.display()
    )]
    ScriptNotFound(PathBuf),

    /// The interpreter process could not be started.
    #[error(
        "could not start '{program}': {source}\n\
         check that the interpreter is installed and on PATH (try '{program} --version')"
    )]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The child ran past the configured timeout and was killed.
    #[error("{0}")]
    TimedOut(Box<FailureDetail>),

    /// The child exited nonzero or was killed by a signal.
    #[error("{0}")]
    ProcessFailed(Box<FailureDetail>),

    /// Environment or stream I/O failure around the run itself.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    /// Stable kind slug used in JSON reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::MissingSelection(_) => "missing-selection",
            RunError::UnencodablePath(_) => "unencodable-path",
            RunError::ScriptNotFound(_) => "script-not-found",
            RunError::LaunchFailed { .. } => "launch-failed",
            RunError::TimedOut(_) => "timed-out",
            RunError::ProcessFailed(_) => "process-failed",
            RunError::Io(_) => "io",
        }
    }

    /// The diagnostic payload, when this error carries one.
    pub fn failure_detail(&self) -> Option<&FailureDetail> {
        match self {
            RunError::TimedOut(detail) | RunError::ProcessFailed(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Diagnostic payload for a failed run: exit status, both captured streams,
/// and the inputs that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    /// Child exit code; `None` when the child did not exit on its own.
    pub exit_code: Option<i32>,
    /// True when the runner killed the child at the timeout.
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    /// Bytes dropped beyond the capture limit, per stream.
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub inputs: RunInputs,
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.timed_out {
            writeln!(f, "transformation timed out and was killed")?;
        } else {
            match self.exit_code {
                Some(code) => writeln!(f, "transformation failed with exit code {code}")?,
                None => writeln!(f, "transformation was killed by a signal")?,
            }
        }
        writeln!(f, "  sbvt: {}", file_name_or_path(&self.inputs.sbvt))?;
        writeln!(f, "  inmet: {}", file_name_or_path(&self.inputs.inmet))?;
        writeln!(f, "  upper air: {} file(s)", self.inputs.upper_air.len())?;
        writeln!(f, "  destination: {}", self.inputs.destination.display())?;
        writeln!(f, "=== stderr ===")?;
        writeln!(f, "{}", section(&self.stderr, self.stderr_truncated))?;
        writeln!(f, "=== stdout ===")?;
        write!(f, "{}", section(&self.stdout, self.stdout_truncated))
    }
}

fn join_labels(fields: &[SelectionField]) -> String {
    fields
        .iter()
        .map(|field| field.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn file_name_or_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn section(text: &str, truncated: usize) -> String {
    let mut body = if text.trim().is_empty() {
        "(empty)".to_string()
    } else {
        text.trim_end().to_string()
    };
    if truncated > 0 {
        body.push_str(&format!("\n[truncated {truncated} bytes]"));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_inputs;

    fn detail(exit_code: Option<i32>, timed_out: bool) -> FailureDetail {
        FailureDetail {
            exit_code,
            timed_out,
            stdout: String::new(),
            stderr: "boom\n".to_string(),
            stdout_truncated: 0,
            stderr_truncated: 0,
            inputs: sample_inputs(),
        }
    }

    #[test]
    fn missing_selection_lists_every_field() {
        let err =
            RunError::MissingSelection(vec![SelectionField::Sbvt, SelectionField::Destination]);
        assert_eq!(
            err.to_string(),
            "missing required inputs: sbvt, destination"
        );
    }

    #[test]
    fn process_failure_bundles_streams_and_inputs() {
        let text = RunError::ProcessFailed(Box::new(detail(Some(7), false))).to_string();

        assert!(text.contains("exit code 7"));
        assert!(text.contains("sbvt: SBVT.csv"));
        assert!(text.contains("upper air: 2 file(s)"));
        assert!(text.contains("=== stderr ===\nboom"));
        assert!(text.contains("=== stdout ===\n(empty)"));
    }

    #[test]
    fn timeout_names_the_timeout() {
        let text = RunError::TimedOut(Box::new(detail(None, true))).to_string();
        assert!(text.contains("timed out"));
    }

    #[test]
    fn truncated_streams_carry_a_notice() {
        let mut detail = detail(Some(1), false);
        detail.stderr_truncated = 512;

        let text = RunError::ProcessFailed(Box::new(detail)).to_string();
        assert!(text.contains("[truncated 512 bytes]"));
    }

    #[test]
    fn launch_failure_hints_at_the_interpreter() {
        let err = RunError::LaunchFailed {
            program: "python".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };

        let text = err.to_string();
        assert!(text.contains("could not start 'python'"));
        assert!(text.contains("'python --version'"));
    }
}
