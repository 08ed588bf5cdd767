//! Advisory checks on selected file names.
//!
//! The expected inputs follow strict naming conventions, but flags accept
//! any path, so deviations surface as warnings. Nothing here blocks a run.

use std::path::Path;

use crate::core::selection::RunInputs;

/// Collect warnings for inputs whose names break the expected conventions.
pub fn advisories(inputs: &RunInputs) -> Vec<String> {
    let mut warnings = Vec::new();

    if !has_extension(&inputs.sbvt, "csv") {
        warnings.push(format!(
            "sbvt file {} does not have the expected .csv extension",
            inputs.sbvt.display()
        ));
    }
    if !has_extension(&inputs.inmet, "csv") {
        warnings.push(format!(
            "inmet file {} does not have the expected .csv extension",
            inputs.inmet.display()
        ));
    }
    if !looks_like_inmet_export(&inputs.inmet) {
        warnings.push(format!(
            "inmet file {} does not look like an hourly station export (dados_<station>_H_...)",
            inputs.inmet.display()
        ));
    }
    for path in &inputs.upper_air {
        if !has_extension(path, "nc") {
            warnings.push(format!(
                "upper-air file {} does not have the expected .nc extension",
                path.display()
            ));
        }
        if !has_datestamp(path) {
            warnings.push(format!(
                "upper-air file {} has no .YYYYMMDDHH. datestamp in its name; \
                 the transformation reads the sounding time from it",
                path.display()
            ));
        }
    }

    warnings
}

fn has_extension(path: &Path, expected: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(expected))
}

fn looks_like_inmet_export(path: &Path) -> bool {
    use std::sync::LazyLock;
    static INMET_RE: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"^dados_[A-Za-z0-9]+_H_").unwrap());

    file_name(path).is_some_and(|name| INMET_RE.is_match(name))
}

fn has_datestamp(path: &Path) -> bool {
    use std::sync::LazyLock;
    static DATESTAMP_RE: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"\.\d{10}\.").unwrap());

    file_name(path).is_some_and(|name| DATESTAMP_RE.is_match(name))
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}
