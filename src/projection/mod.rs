//! Dict projection: record trees as nested or flattened mappings, and back.
//!
//! - `nested`: one mapping level per record level
//! - `flat`: one level, keys are joined field paths

pub mod flat;
pub mod nested;

pub use flat::*;
pub use nested::*;
