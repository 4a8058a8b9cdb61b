//! Parameter sweeps.
//!
//! Responsibilities:
//!
//! - find every `Settings` slot in a record tree (`slots`)
//! - count combinations without materializing them (`slots`)
//! - expand the tree into one concrete record per combination (`expand`)
//!
//! Only finite enumeration lives here; driving a search over the results is
//! left to whatever consumes them.

pub mod expand;
pub mod slots;

pub use expand::*;
pub use slots::*;

use crate::domain::Record;
use crate::error::Result;

impl Record {
    /// Shorthand for [`get_settings`].
    pub fn get_settings(&self) -> Result<Vec<Record>> {
        get_settings(self)
    }
}
