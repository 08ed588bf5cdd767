//! Pure, deterministic logic for run preparation.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod args;
pub mod naming;
pub mod selection;
