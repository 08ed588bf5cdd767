//! Argument encoding for the transformation script invocation.
//!
//! The script receives four positional arguments after its own path: the SBVT
//! file, the INMET file, the upper-air files joined into one `;`-separated
//! argument, and the destination folder. Arguments travel through the argv
//! vector, never a shell, so embedded spaces need no extra quoting.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::core::selection::RunInputs;
use crate::error::RunError;

/// Separator the script splits the upper-air argument on.
pub const UPPER_AIR_SEPARATOR: &str = ";";

/// Join the upper-air paths into the single list argument.
///
/// A path containing the separator cannot be represented: the script would
/// split it into bogus entries. Such paths are rejected here, before any
/// process is started.
pub fn join_upper_air(paths: &[PathBuf]) -> Result<OsString, RunError> {
    let mut joined = OsString::new();
    for (i, path) in paths.iter().enumerate() {
        if contains_separator(path) {
            return Err(RunError::UnencodablePath(path.clone()));
        }
        if i > 0 {
            joined.push(UPPER_AIR_SEPARATOR);
        }
        joined.push(path.as_os_str());
    }
    Ok(joined)
}

/// Build the script invocation arguments in contract order: script path,
/// SBVT file, INMET file, joined upper-air list, destination folder.
pub fn build_script_args(script: &Path, inputs: &RunInputs) -> Result<Vec<OsString>, RunError> {
    let upper_air = join_upper_air(&inputs.upper_air)?;
    Ok(vec![
        script.as_os_str().to_os_string(),
        inputs.sbvt.as_os_str().to_os_string(),
        inputs.inmet.as_os_str().to_os_string(),
        upper_air,
        inputs.destination.as_os_str().to_os_string(),
    ])
}

fn contains_separator(path: &Path) -> bool {
    path.as_os_str().as_encoded_bytes().contains(&b';')
}
