//! I/O helpers for calprep commands.

pub mod config;
pub mod launcher;
pub mod process;
pub mod script;
