//! Environment preflight for the `check` command.
//!
//! Reports whether the companion script is deployed and whether the
//! configured interpreter starts, without running the transformation.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::error::RunError;
use crate::io::config::PrepConfig;
use crate::io::launcher::{LaunchSpec, ProcessLauncher};
use crate::io::process::CommandOutput;
use crate::io::script::{base_directory, script_location};

/// Probe timeout; `--version` should return immediately.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A version banner is a line or two.
const PROBE_OUTPUT_LIMIT: usize = 4096;

/// What the preflight found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub script_path: PathBuf,
    pub script_present: bool,
    pub interpreter: String,
    /// First line of the interpreter's `--version` banner, when it started.
    pub interpreter_version: Option<String>,
}

impl CheckOutcome {
    pub fn ok(&self) -> bool {
        self.script_present && self.interpreter_version.is_some()
    }
}

/// Probe the script location and the interpreter.
///
/// A missing script or an unstartable interpreter is reported in the
/// outcome, not returned as an error.
pub fn check_environment<L: ProcessLauncher>(
    launcher: &L,
    config: &PrepConfig,
) -> Result<CheckOutcome, RunError> {
    let script_path = script_location(config)?;
    let script_present = script_path.is_file();

    let spec = LaunchSpec {
        program: config.interpreter.clone(),
        args: vec![OsString::from("--version")],
        cwd: base_directory()?,
        timeout: PROBE_TIMEOUT,
        output_limit_bytes: PROBE_OUTPUT_LIMIT,
    };
    let interpreter_version = match launcher.launch(&spec) {
        Ok(output) if output.success() => version_line(&output),
        Ok(output) => {
            debug!(exit_code = ?output.exit_code, "interpreter probe failed");
            None
        }
        Err(err) => {
            debug!(error = %err, "interpreter probe could not start");
            None
        }
    };

    Ok(CheckOutcome {
        script_path,
        script_present,
        interpreter: config.interpreter.clone(),
        interpreter_version,
    })
}

// Older interpreters print the version banner to stderr.
fn version_line(output: &CommandOutput) -> Option<String> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
}
