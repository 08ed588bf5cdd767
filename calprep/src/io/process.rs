//! Child process execution with a timeout and bounded stream capture.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// How long to keep draining the pipes after a killed child. Processes the
/// child spawned inherit the write ends and can outlive it; once the grace
/// elapses the run returns with whatever was captured so far.
const KILL_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Why a child process run could not produce an outcome.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The process never started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// The process started but capturing or reaping it failed.
    #[error("process capture failed: {0}")]
    Capture(#[from] std::io::Error),
}

/// Captured result of one child process run.
///
/// `exit_code` is `None` when the child did not exit on its own: the runner
/// killed it at the timeout (`timed_out` set) or a signal did.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    /// True when the child exited on its own with code 0.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// One event from a pipe reader thread.
enum StreamEvent {
    Chunk(Vec<u8>),
    Eof { dropped: usize },
    ReadFailed(std::io::Error),
}

/// What one stream yielded before EOF, a read error, or the drain deadline.
struct StreamCapture {
    data: Vec<u8>,
    dropped: usize,
    reached_eof: bool,
}

/// Run `cmd` to completion, capturing stdout and stderr.
///
/// Both pipes are drained concurrently while the child runs, so a full pipe
/// buffer can never deadlock it. Each captured stream is bounded by
/// `output_limit_bytes`; bytes past the limit are drained and counted, not
/// stored. A child that outlives `timeout` is killed and reaped, and the
/// output is marked `timed_out`; draining then stops when the pipes close or
/// [`KILL_DRAIN_GRACE`] elapses, even if a process spawned by the child
/// still holds the write ends.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput, ProcessError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let program = cmd.get_program().to_string_lossy().into_owned();
    debug!(program = %program, "spawning child process");
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            error!(err = %source, program = %program, "failed to start child process");
            return Err(ProcessError::Spawn { program, source });
        }
    };

    let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;
    let (stdout_tx, stdout_rx) = mpsc::channel();
    let (stderr_tx, stderr_rx) = mpsc::channel();
    thread::spawn(move || drain_limited(stdout, output_limit_bytes, stdout_tx));
    thread::spawn(move || drain_limited(stderr, output_limit_bytes, stderr_tx));

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "child ran past the timeout, killing it"
            );
            timed_out = true;
            kill_and_reap(&mut child)?
        }
        Err(err) => {
            let _ = kill_and_reap(&mut child);
            return Err(ProcessError::Capture(err));
        }
    };

    // After a kill the pipes can stay open: anything the child spawned
    // inherits the write ends. Drain until the grace deadline instead of
    // waiting for every holder to exit.
    let deadline = timed_out.then(|| Instant::now() + KILL_DRAIN_GRACE);
    let stdout = collect_stream(&stdout_rx, deadline)?;
    let stderr = collect_stream(&stderr_rx, deadline)?;
    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(
            stdout_truncated = stdout.dropped,
            stderr_truncated = stderr.dropped,
            "captured output hit the limit"
        );
    }
    if !stdout.reached_eof || !stderr.reached_eof {
        warn!(
            grace_secs = KILL_DRAIN_GRACE.as_secs(),
            "gave up draining output, a process spawned by the child still holds the pipes"
        );
    }

    let exit_code = if timed_out { None } else { status.code() };
    debug!(exit_code = ?exit_code, timed_out, "child finished");
    Ok(CommandOutput {
        exit_code,
        stdout: stdout.data,
        stderr: stderr.data,
        stdout_truncated: stdout.dropped,
        stderr_truncated: stderr.dropped,
        timed_out,
    })
}

fn kill_and_reap(child: &mut Child) -> Result<ExitStatus, ProcessError> {
    if let Err(err) = child.kill() {
        debug!(err = %err, "kill after timeout failed");
    }
    Ok(child.wait()?)
}

fn missing_pipe(stream: &str) -> ProcessError {
    ProcessError::Capture(std::io::Error::other(format!("{stream} was not piped")))
}

/// Receive events for one stream until EOF or, when `deadline` is set,
/// until it passes. Events already queued are collected either way.
fn collect_stream(
    rx: &mpsc::Receiver<StreamEvent>,
    deadline: Option<Instant>,
) -> Result<StreamCapture, ProcessError> {
    let mut capture = StreamCapture {
        data: Vec::new(),
        dropped: 0,
        reached_eof: false,
    };
    loop {
        let event = match deadline {
            None => rx.recv().ok(),
            Some(deadline) => rx
                .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                .ok(),
        };
        match event {
            Some(StreamEvent::Chunk(bytes)) => capture.data.extend_from_slice(&bytes),
            Some(StreamEvent::Eof { dropped }) => {
                capture.dropped = dropped;
                capture.reached_eof = true;
                return Ok(capture);
            }
            Some(StreamEvent::ReadFailed(err)) => return Err(ProcessError::Capture(err)),
            None => return Ok(capture),
        }
    }
}

fn drain_limited<R: Read>(mut reader: R, limit: usize, tx: mpsc::Sender<StreamEvent>) {
    let mut stored = 0usize;
    let mut dropped = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                let _ = tx.send(StreamEvent::ReadFailed(err));
                return;
            }
        };
        let keep = n.min(limit.saturating_sub(stored));
        if keep > 0 {
            stored += keep;
            if tx.send(StreamEvent::Chunk(chunk[..keep].to_vec())).is_err() {
                return;
            }
        }
        dropped += n - keep;
    }

    let _ = tx.send(StreamEvent::Eof { dropped });
}
