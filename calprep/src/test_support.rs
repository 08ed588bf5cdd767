//! Test-only helpers for constructing run inputs and fixture files.

use std::fs;
use std::path::Path;

use crate::core::selection::RunInputs;

/// Create a deterministic, fully conforming input set.
pub fn sample_inputs() -> RunInputs {
    RunInputs {
        sbvt: "/data/SBVT.csv".into(),
        inmet: "/data/dados_A612_H_2024-01-01_2024-12-31.csv".into(),
        upper_air: vec![
            "/data/upper/era5.2024010100.nc".into(),
            "/data/upper/era5.2024010112.nc".into(),
        ],
        destination: "/data/out".into(),
    }
}

/// Create an empty file, creating parent directories as needed.
pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    fs::write(path, "").expect("create fixture file");
}
