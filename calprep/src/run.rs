//! Orchestration of a single transformation run.
//!
//! Resolves the companion script, builds its argument list, launches the
//! interpreter through a [`ProcessLauncher`], and classifies the outcome.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::core::args::build_script_args;
use crate::core::selection::RunInputs;
use crate::error::{FailureDetail, RunError};
use crate::io::config::PrepConfig;
use crate::io::launcher::{LaunchSpec, ProcessLauncher};
use crate::io::process::{CommandOutput, ProcessError};
use crate::io::script::{base_directory, resolve_script};

/// Artifact names the transformation script writes into the destination
/// directory. Reported to the user after a successful run, never verified.
pub const EXPECTED_OUTPUTS: [&str; 4] = [
    "radiacao_tratada.csv",
    "teste2.csv",
    "upperair_tratado.csv",
    "UpperAir_<year>_Gerado.DAT",
];

/// Captured result of a successful run (exit code zero).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Bytes dropped from stdout once the capture limit was reached.
    pub stdout_truncated: usize,
    /// Bytes dropped from stderr once the capture limit was reached.
    pub stderr_truncated: usize,
}

/// Run the transformation script over the selected inputs.
///
/// Fails before launching anything if the script is absent or an upper-air
/// path cannot travel through the joined argument. After launch, exit code
/// zero is the only success; every other outcome carries the full captured
/// streams in a [`FailureDetail`].
#[instrument(skip_all, fields(upper_air_count = inputs.upper_air.len()))]
pub fn run_job<L: ProcessLauncher>(
    launcher: &L,
    config: &PrepConfig,
    inputs: &RunInputs,
) -> Result<RunOutput, RunError> {
    let script = resolve_script(config)?;
    let args = build_script_args(&script, inputs)?;
    let cwd = base_directory()?;

    info!(
        interpreter = %config.interpreter,
        script = %script.display(),
        "launching transformation"
    );
    let spec = LaunchSpec {
        program: config.interpreter.clone(),
        args,
        cwd,
        timeout: Duration::from_secs(config.run.timeout_secs),
        output_limit_bytes: config.run.output_limit_bytes,
    };
    let output = launcher.launch(&spec).map_err(|err| match err {
        ProcessError::Spawn { program, source } => RunError::LaunchFailed { program, source },
        ProcessError::Capture(source) => RunError::Io(source),
    })?;
    classify(output, inputs)
}

fn classify(output: CommandOutput, inputs: &RunInputs) -> Result<RunOutput, RunError> {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.timed_out {
        warn!("transformation timed out and was killed");
        return Err(RunError::TimedOut(Box::new(FailureDetail {
            exit_code: None,
            timed_out: true,
            stdout,
            stderr,
            stdout_truncated: output.stdout_truncated,
            stderr_truncated: output.stderr_truncated,
            inputs: inputs.clone(),
        })));
    }
    match output.exit_code {
        Some(0) => {
            debug!("transformation succeeded");
            Ok(RunOutput {
                exit_code: 0,
                stdout,
                stderr,
                stdout_truncated: output.stdout_truncated,
                stderr_truncated: output.stderr_truncated,
            })
        }
        code => {
            warn!(exit_code = ?code, "transformation failed");
            Err(RunError::ProcessFailed(Box::new(FailureDetail {
                exit_code: code,
                timed_out: false,
                stdout,
                stderr,
                stdout_truncated: output.stdout_truncated,
                stderr_truncated: output.stderr_truncated,
                inputs: inputs.clone(),
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::ffi::OsString;
    use std::path::Path;

    use super::*;
    use crate::test_support::{sample_inputs, touch};

    struct ScriptedLauncher {
        outputs: RefCell<VecDeque<CommandOutput>>,
        specs: RefCell<Vec<LaunchSpec>>,
    }

    impl ScriptedLauncher {
        fn new(outputs: Vec<CommandOutput>) -> Self {
            Self {
                outputs: RefCell::new(outputs.into()),
                specs: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.specs.borrow().len()
        }
    }

    impl ProcessLauncher for ScriptedLauncher {
        fn launch(&self, spec: &LaunchSpec) -> Result<CommandOutput, ProcessError> {
            self.specs.borrow_mut().push(spec.clone());
            Ok(self
                .outputs
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| output_with(Some(0), "", "")))
        }
    }

    struct FailingLauncher;

    impl ProcessLauncher for FailingLauncher {
        fn launch(&self, _spec: &LaunchSpec) -> Result<CommandOutput, ProcessError> {
            Err(ProcessError::Spawn {
                program: "python".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            })
        }
    }

    fn output_with(exit_code: Option<i32>, stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            exit_code,
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            stdout_truncated: 0,
            stderr_truncated: 0,
            timed_out: false,
        }
    }

    fn test_config(dir: &Path) -> PrepConfig {
        let script = dir.join("script.py");
        touch(&script);
        let mut config = PrepConfig::default();
        config.script.path = Some(script);
        config
    }

    fn failure(err: RunError) -> FailureDetail {
        match err {
            RunError::ProcessFailed(detail) | RunError::TimedOut(detail) => *detail,
            other => panic!("expected a failure with detail, got: {other}"),
        }
    }

    /// Verifies exit code zero is success no matter what the streams hold.
    #[test]
    fn exit_zero_is_success_regardless_of_streams() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = test_config(temp.path());
        let launcher = ScriptedLauncher::new(vec![output_with(Some(0), "noise\n", "warnings\n")]);

        let output = run_job(&launcher, &config, &sample_inputs()).expect("must succeed");
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, "noise\n");
        assert_eq!(output.stderr, "warnings\n");
    }

    /// Verifies the launch spec carries the interpreter, the script path, and
    /// the four input arguments with upper-air paths joined by `;`.
    #[test]
    fn launch_spec_follows_the_command_contract() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = test_config(temp.path());
        let script = config.script.path.clone().expect("script path");
        let launcher = ScriptedLauncher::new(vec![output_with(Some(0), "", "")]);
        let inputs = sample_inputs();

        run_job(&launcher, &config, &inputs).expect("must succeed");

        let specs = launcher.specs.borrow();
        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.program, "python");
        assert_eq!(spec.timeout, Duration::from_secs(60 * 60));
        assert_eq!(spec.output_limit_bytes, 10_000_000);

        let joined: OsString = {
            let mut joined = inputs.upper_air[0].clone().into_os_string();
            joined.push(";");
            joined.push(&inputs.upper_air[1]);
            joined
        };
        assert_eq!(spec.args.len(), 5);
        assert_eq!(spec.args[0], script.as_os_str());
        assert_eq!(spec.args[1], inputs.sbvt.as_os_str());
        assert_eq!(spec.args[2], inputs.inmet.as_os_str());
        assert_eq!(spec.args[3], joined);
        assert_eq!(spec.args[4], inputs.destination.as_os_str());
    }

    /// Verifies a nonzero exit carries both streams and the inputs that fed it.
    #[test]
    fn failure_carries_streams_and_inputs() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = test_config(temp.path());
        let launcher = ScriptedLauncher::new(vec![output_with(Some(1), "partial\n", "boom\n")]);
        let inputs = sample_inputs();

        let detail = failure(run_job(&launcher, &config, &inputs).expect_err("must fail"));
        assert_eq!(detail.exit_code, Some(1));
        assert!(!detail.timed_out);
        assert_eq!(detail.stdout, "partial\n");
        assert_eq!(detail.stderr, "boom\n");
        assert_eq!(detail.inputs, inputs);
    }

    /// Verifies the run stops before any launch when the script is absent.
    #[test]
    fn missing_script_stops_before_launch() {
        let temp = tempfile::tempdir().expect("tempdir");
        let absent = temp.path().join("script.py");
        let mut config = PrepConfig::default();
        config.script.path = Some(absent.clone());
        let launcher = ScriptedLauncher::new(vec![]);

        let err = run_job(&launcher, &config, &sample_inputs()).expect_err("must fail");
        match err {
            RunError::ScriptNotFound(path) => assert_eq!(path, absent),
            other => panic!("expected ScriptNotFound, got: {other}"),
        }
        assert_eq!(launcher.calls(), 0);
    }

    /// Verifies a `;` in an upper-air path is rejected before any launch.
    #[test]
    fn separator_in_upper_air_stops_before_launch() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = test_config(temp.path());
        let launcher = ScriptedLauncher::new(vec![]);
        let mut inputs = sample_inputs();
        inputs.upper_air = vec!["/data/upper/era5;jan.nc".into()];

        let err = run_job(&launcher, &config, &inputs).expect_err("must fail");
        assert!(matches!(err, RunError::UnencodablePath(_)));
        assert_eq!(launcher.calls(), 0);
    }

    /// Verifies an unstartable interpreter never turns into success.
    #[test]
    fn launch_failure_is_not_success() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = test_config(temp.path());

        let err = run_job(&FailingLauncher, &config, &sample_inputs()).expect_err("must fail");
        match err {
            RunError::LaunchFailed { program, .. } => assert_eq!(program, "python"),
            other => panic!("expected LaunchFailed, got: {other}"),
        }
    }

    /// Verifies a timed-out child is classified as [`RunError::TimedOut`].
    #[test]
    fn timeout_is_classified_as_timed_out() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = test_config(temp.path());
        let mut output = output_with(None, "started\n", "");
        output.timed_out = true;
        let launcher = ScriptedLauncher::new(vec![output]);

        let err = run_job(&launcher, &config, &sample_inputs()).expect_err("must fail");
        assert!(matches!(err, RunError::TimedOut(_)));
        let detail = failure(err);
        assert!(detail.timed_out);
        assert_eq!(detail.exit_code, None);
        assert_eq!(detail.stdout, "started\n");
    }

    /// Verifies identical child outcomes classify to identical failures.
    #[test]
    fn identical_outcomes_classify_identically() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = test_config(temp.path());
        let launcher = ScriptedLauncher::new(vec![
            output_with(Some(2), "a\n", "b\n"),
            output_with(Some(2), "a\n", "b\n"),
        ]);
        let inputs = sample_inputs();

        let first = failure(run_job(&launcher, &config, &inputs).expect_err("must fail"));
        let second = failure(run_job(&launcher, &config, &inputs).expect_err("must fail"));
        assert_eq!(first, second);
    }
}
