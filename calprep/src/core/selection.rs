//! Selection state for the four run inputs.
//!
//! Inputs arrive as CLI flags and accumulate here until all four are set.
//! This layer is pure: no path existence or file-type checks happen here.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::RunError;

/// One of the four required run inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionField {
    Sbvt,
    Inmet,
    UpperAir,
    Destination,
}

impl SelectionField {
    /// Stable label used in messages and JSON payloads.
    pub fn label(self) -> &'static str {
        match self {
            SelectionField::Sbvt => "sbvt",
            SelectionField::Inmet => "inmet",
            SelectionField::UpperAir => "upper-air",
            SelectionField::Destination => "destination",
        }
    }
}

impl fmt::Display for SelectionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which inputs the user has picked so far.
///
/// `upper_air` holds zero or more files in selection order; the other three
/// fields are single paths. A run may start only once [`Selection::is_ready`]
/// holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    sbvt: Option<PathBuf>,
    inmet: Option<PathBuf>,
    upper_air: Vec<PathBuf>,
    destination: Option<PathBuf>,
}

impl Selection {
    pub fn set_sbvt(&mut self, path: PathBuf) {
        self.sbvt = Some(path);
    }

    pub fn set_inmet(&mut self, path: PathBuf) {
        self.inmet = Some(path);
    }

    /// Replace the upper-air file list, preserving the given order.
    pub fn set_upper_air(&mut self, paths: Vec<PathBuf>) {
        self.upper_air = paths;
    }

    pub fn set_destination(&mut self, path: PathBuf) {
        self.destination = Some(path);
    }

    /// Clear all four fields.
    pub fn clear(&mut self) {
        *self = Selection::default();
    }

    /// True iff every field is non-empty (at least one upper-air file).
    pub fn is_ready(&self) -> bool {
        self.missing().is_empty()
    }

    /// Absent fields, in fixed order: sbvt, inmet, upper-air, destination.
    pub fn missing(&self) -> Vec<SelectionField> {
        let mut fields = Vec::new();
        if self.sbvt.is_none() {
            fields.push(SelectionField::Sbvt);
        }
        if self.inmet.is_none() {
            fields.push(SelectionField::Inmet);
        }
        if self.upper_air.is_empty() {
            fields.push(SelectionField::UpperAir);
        }
        if self.destination.is_none() {
            fields.push(SelectionField::Destination);
        }
        fields
    }

    /// Snapshot the selection into resolved run inputs, or report every
    /// missing field.
    pub fn resolve(&self) -> Result<RunInputs, RunError> {
        match (&self.sbvt, &self.inmet, &self.destination) {
            (Some(sbvt), Some(inmet), Some(destination)) if !self.upper_air.is_empty() => {
                Ok(RunInputs {
                    sbvt: sbvt.clone(),
                    inmet: inmet.clone(),
                    upper_air: self.upper_air.clone(),
                    destination: destination.clone(),
                })
            }
            _ => Err(RunError::MissingSelection(self.missing())),
        }
    }
}

/// Resolved inputs for one run.
///
/// Produced by [`Selection::resolve`]; `upper_air` is non-empty by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunInputs {
    pub sbvt: PathBuf,
    pub inmet: PathBuf,
    pub upper_air: Vec<PathBuf>,
    pub destination: PathBuf,
}
