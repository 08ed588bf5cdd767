//! Process exit codes for the calprep binary.

use crate::error::RunError;

/// The command completed.
pub const OK: i32 = 0;

/// Invalid invocation: bad flags, unreadable config, or an input path that
/// cannot be encoded into the script's argument list.
pub const INVALID: i32 = 1;

/// One or more required inputs were not selected.
pub const MISSING_SELECTION: i32 = 2;

/// The transformation script is absent at its resolved location.
pub const SCRIPT_NOT_FOUND: i32 = 3;

/// The interpreter process could not be started.
pub const LAUNCH_FAILED: i32 = 4;

/// The transformation ran and exited nonzero (or died to a signal).
pub const PROCESS_FAILED: i32 = 5;

/// The transformation ran past its timeout and was killed.
pub const TIMED_OUT: i32 = 6;

pub fn for_error(err: &RunError) -> i32 {
    match err {
        RunError::MissingSelection(_) => MISSING_SELECTION,
        RunError::UnencodablePath(_) => INVALID,
        RunError::ScriptNotFound(_) => SCRIPT_NOT_FOUND,
        RunError::LaunchFailed { .. } => LAUNCH_FAILED,
        RunError::TimedOut(_) => TIMED_OUT,
        RunError::ProcessFailed(_) => PROCESS_FAILED,
        RunError::Io(_) => INVALID,
    }
}
