//! Reporting utilities: formatted terminal output for the `params` binary.

pub mod format;

pub use format::*;
