//! Tool configuration stored next to the executable (`calprep.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, resolved in the executable's directory.
pub const CONFIG_FILE_NAME: &str = "calprep.toml";

/// Tool configuration (TOML).
///
/// Intended to be edited by hand; every field has a default, so a partial or
/// missing file still yields a working tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PrepConfig {
    /// Interpreter used to run the transformation script.
    pub interpreter: String,

    pub script: ScriptConfig,

    pub run: RunLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScriptConfig {
    /// Script file name expected next to the executable.
    pub file_name: String,

    /// Absolute path override; when set, `file_name` is ignored.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunLimits {
    /// Kill the transformation process after this many seconds.
    pub timeout_secs: u64,

    /// Per-stream capture limit in bytes.
    pub output_limit_bytes: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            file_name: "script.py".to_string(),
            path: None,
        }
    }
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            timeout_secs: 60 * 60,
            output_limit_bytes: 10_000_000,
        }
    }
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            interpreter: "python".to_string(),
            script: ScriptConfig::default(),
            run: RunLimits::default(),
        }
    }
}

impl PrepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interpreter.trim().is_empty() {
            return Err(anyhow!("interpreter must be non-empty"));
        }
        if self.script.file_name.trim().is_empty() {
            return Err(anyhow!("script.file_name must be non-empty"));
        }
        if self.run.timeout_secs == 0 {
            return Err(anyhow!("run.timeout_secs must be > 0"));
        }
        if self.run.output_limit_bytes == 0 {
            return Err(anyhow!("run.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Default config location: [`CONFIG_FILE_NAME`] next to the executable.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(crate::io::script::base_directory()?.join(CONFIG_FILE_NAME))
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PrepConfig::default()`.
pub fn load_config(path: &Path) -> Result<PrepConfig> {
    if !path.exists() {
        let cfg = PrepConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PrepConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &PrepConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, PrepConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("calprep.toml");
        let mut cfg = PrepConfig::default();
        cfg.interpreter = "python3".to_string();
        cfg.script.path = Some(temp.path().join("script.py"));

        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("calprep.toml");
        fs::write(&path, "interpreter = \"python3\"\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.interpreter, "python3");
        assert_eq!(cfg.script, ScriptConfig::default());
        assert_eq!(cfg.run, RunLimits::default());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("calprep.toml");
        fs::write(&path, "[run]\ntimeout_secs = 0\n").expect("write");

        let err = load_config(&path).expect_err("must reject");
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn empty_interpreter_is_rejected() {
        let mut cfg = PrepConfig::default();
        cfg.interpreter = "  ".to_string();

        let err = cfg.validate().expect_err("must reject");
        assert!(err.to_string().contains("interpreter"));
    }
}
