//! Front-end for a meteorological input preparation pipeline.
//!
//! This crate collects the input files a transformation script needs (solar
//! station export, INMET station export, upper-air model files, destination
//! directory), then launches the script through a configured interpreter and
//! classifies the outcome. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (selection state, argument
//!   building, file-name advisories). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config files, script resolution,
//!   process launch). Isolated behind a launcher trait to enable mocking.
//!
//! Orchestration modules ([`run`], [`check`]) coordinate core logic with I/O
//! to implement CLI commands.

pub mod check;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
