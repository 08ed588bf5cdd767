//! CLI front-end for the meteorological input preparation pipeline.
//!
//! Collects the four run inputs as flags, launches the companion
//! transformation script through the configured interpreter, and maps each
//! outcome to a distinct exit code.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use calprep::check::check_environment;
use calprep::core::naming::advisories;
use calprep::core::selection::{RunInputs, Selection};
use calprep::error::{FailureDetail, RunError};
use calprep::exit_codes;
use calprep::io::config::{PrepConfig, default_config_path, load_config, write_config};
use calprep::io::launcher::{RunLog, SystemLauncher, write_run_log};
use calprep::logging;
use calprep::run::{EXPECTED_OUTPUTS, RunOutput, run_job};

#[derive(Parser)]
#[command(
    name = "calprep",
    version,
    about = "Front-end for the meteorological input preparation script"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the transformation script over the selected input files.
    Run(RunArgs),
    /// Probe the script location and the interpreter without running.
    Check {
        /// Config file (defaults to calprep.toml next to the executable).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Emit a machine-readable JSON report on stdout.
        #[arg(long)]
        json: bool,
    },
    /// Write a default config file next to the executable.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
        /// Config file (defaults to calprep.toml next to the executable).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Solar station export (CSV).
    #[arg(long)]
    sbvt: Option<PathBuf>,

    /// INMET station export (CSV).
    #[arg(long)]
    inmet: Option<PathBuf>,

    /// Upper-air model file; repeat the flag once per file.
    #[arg(long)]
    upper_air: Vec<PathBuf>,

    /// Destination directory for the generated artifacts.
    #[arg(long)]
    dest: Option<PathBuf>,

    /// Config file (defaults to calprep.toml next to the executable).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the captured stdout/stderr to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Emit a machine-readable JSON report on stdout.
    #[arg(long)]
    json: bool,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => cmd_run(args),
        Command::Check { config, json } => cmd_check(config.as_deref(), json),
        Command::Init { force, config } => cmd_init(force, config.as_deref()),
    }
}

fn cmd_run(args: RunArgs) -> Result<i32> {
    let config = load_run_config(args.config.as_deref())?;

    let mut selection = Selection::default();
    if let Some(path) = args.sbvt {
        selection.set_sbvt(path);
    }
    if let Some(path) = args.inmet {
        selection.set_inmet(path);
    }
    if !args.upper_air.is_empty() {
        selection.set_upper_air(args.upper_air);
    }
    if let Some(path) = args.dest {
        selection.set_destination(path);
    }

    let inputs = match selection.resolve() {
        Ok(inputs) => inputs,
        Err(err) => return report_run_error(&err, args.json),
    };
    if let Err(err) = ensure_input_files_exist(&inputs) {
        return report_run_error(&err, args.json);
    }

    for warning in advisories(&inputs) {
        eprintln!("warning: {warning}");
    }

    match run_job(&SystemLauncher, &config, &inputs) {
        Ok(output) => {
            if let Some(path) = &args.log_file {
                write_run_log(
                    path,
                    &RunLog {
                        stdout: &output.stdout,
                        stderr: &output.stderr,
                        stdout_truncated: output.stdout_truncated,
                        stderr_truncated: output.stderr_truncated,
                        timed_out: false,
                    },
                )?;
            }
            report_success(&output, &inputs.destination, args.json)?;
            Ok(exit_codes::OK)
        }
        Err(err) => {
            if let (Some(path), Some(detail)) = (&args.log_file, err.failure_detail()) {
                write_run_log(
                    path,
                    &RunLog {
                        stdout: &detail.stdout,
                        stderr: &detail.stderr,
                        stdout_truncated: detail.stdout_truncated,
                        stderr_truncated: detail.stderr_truncated,
                        timed_out: detail.timed_out,
                    },
                )?;
            }
            report_run_error(&err, args.json)
        }
    }
}

fn cmd_check(config_path: Option<&Path>, json: bool) -> Result<i32> {
    let config = load_run_config(config_path)?;
    let outcome = match check_environment(&SystemLauncher, &config) {
        Ok(outcome) => outcome,
        Err(err) => return report_run_error(&err, json),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("serialize check report")?
        );
    } else {
        let script_state = if outcome.script_present {
            "present"
        } else {
            "missing"
        };
        println!(
            "check: script={} ({script_state})",
            outcome.script_path.display()
        );
        match &outcome.interpreter_version {
            Some(version) => println!("check: interpreter={} ok ({version})", outcome.interpreter),
            None => println!("check: interpreter={} not startable", outcome.interpreter),
        }
    }

    if outcome.ok() {
        return Ok(exit_codes::OK);
    }
    if !outcome.script_present {
        return Ok(exit_codes::SCRIPT_NOT_FOUND);
    }
    Ok(exit_codes::LAUNCH_FAILED)
}

fn cmd_init(force: bool, config_path: Option<&Path>) -> Result<i32> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    if path.exists() && !force {
        println!("init: kept existing {}", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(&path, &PrepConfig::default())?;
    println!("init: wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn load_run_config(path: Option<&Path>) -> Result<PrepConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    load_config(&path)
}

/// The script reads these itself and would fail obscurely; refuse up front.
/// The destination is not required to exist.
fn ensure_input_files_exist(inputs: &RunInputs) -> Result<(), RunError> {
    for path in [&inputs.sbvt, &inputs.inmet] {
        if !path.is_file() {
            return Err(input_not_found("input file not found", path));
        }
    }
    for path in &inputs.upper_air {
        if !path.is_file() {
            return Err(input_not_found("upper-air file not found", path));
        }
    }
    Ok(())
}

fn input_not_found(what: &str, path: &Path) -> RunError {
    RunError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{what}: {}", path.display()),
    ))
}

#[derive(Serialize)]
struct JsonSuccess<'a> {
    outcome: &'static str,
    exit_code: i32,
    stdout: &'a str,
    stderr: &'a str,
    expected_outputs: Vec<PathBuf>,
}

#[derive(Serialize)]
struct JsonFailure<'a> {
    outcome: &'static str,
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a FailureDetail>,
}

fn report_success(output: &RunOutput, destination: &Path, json: bool) -> Result<()> {
    if json {
        let report = JsonSuccess {
            outcome: "success",
            exit_code: output.exit_code,
            stdout: &output.stdout,
            stderr: &output.stderr,
            expected_outputs: expected_output_paths(destination),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize run report")?
        );
        return Ok(());
    }

    if !output.stdout.is_empty() {
        print!("{}", output.stdout);
        if !output.stdout.ends_with('\n') {
            println!();
        }
    }
    println!("run: outcome=success destination={}", destination.display());
    println!("expected artifacts:");
    for path in expected_output_paths(destination) {
        println!("  {}", path.display());
    }
    Ok(())
}

fn report_run_error(err: &RunError, json: bool) -> Result<i32> {
    if json {
        let report = JsonFailure {
            outcome: "failure",
            kind: err.kind(),
            message: err.to_string(),
            detail: err.failure_detail(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize failure report")?
        );
    } else {
        eprintln!("error: {err}");
    }
    Ok(exit_codes::for_error(err))
}

fn expected_output_paths(destination: &Path) -> Vec<PathBuf> {
    EXPECTED_OUTPUTS
        .iter()
        .map(|name| destination.join(name))
        .collect()
}
