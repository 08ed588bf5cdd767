//! Locating the companion transformation script.
//!
//! The script deploys next to the executable by default; a config override
//! points elsewhere (relocated installs, tests).

use std::env;
use std::path::PathBuf;

use tracing::debug;

use crate::error::RunError;
use crate::io::config::PrepConfig;

/// Directory containing the running executable.
///
/// The script resolves relative to it, and it becomes the child's working
/// directory.
pub fn base_directory() -> Result<PathBuf, RunError> {
    let exe = env::current_exe()?;
    let dir = exe.parent().ok_or_else(|| {
        RunError::Io(std::io::Error::other(format!(
            "executable {} has no parent directory",
            exe.display()
        )))
    })?;
    Ok(dir.to_path_buf())
}

/// Where the script is expected, whether or not it exists there.
pub fn script_location(config: &PrepConfig) -> Result<PathBuf, RunError> {
    if let Some(path) = &config.script.path {
        return Ok(path.clone());
    }
    Ok(base_directory()?.join(&config.script.file_name))
}

/// Resolve the script, failing when it is absent.
pub fn resolve_script(config: &PrepConfig) -> Result<PathBuf, RunError> {
    let path = script_location(config)?;
    if !path.is_file() {
        return Err(RunError::ScriptNotFound(path));
    }
    debug!(script = %path.display(), "resolved transformation script");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn override_path_wins_over_file_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = temp.path().join("elsewhere.py");
        fs::write(&script, "print('ok')\n").expect("write script");

        let mut config = PrepConfig::default();
        config.script.path = Some(script.clone());

        assert_eq!(resolve_script(&config).expect("resolve"), script);
    }

    #[test]
    fn absent_script_reports_the_resolved_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("missing.py");

        let mut config = PrepConfig::default();
        config.script.path = Some(missing.clone());

        match resolve_script(&config).expect_err("must not resolve") {
            RunError::ScriptNotFound(path) => assert_eq!(path, missing),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn default_location_is_file_name_in_base_directory() {
        let config = PrepConfig::default();
        let location = script_location(&config).expect("location");

        assert!(location.is_absolute());
        assert!(location.ends_with("script.py"));
        assert_eq!(
            location.parent().map(PathBuf::from),
            Some(base_directory().expect("base directory"))
        );
    }
}
