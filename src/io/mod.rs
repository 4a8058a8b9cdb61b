//! Input/output helpers.
//!
//! - JSON/YAML text <-> mappings and records (`codec`)
//! - sweep export for external runners (`export`)

pub mod codec;
pub mod export;

pub use codec::*;
pub use export::*;
