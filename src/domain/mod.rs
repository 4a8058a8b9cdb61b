//! Record model.
//!
//! This module defines:
//!
//! - dynamic field values (`Value`, `Settings`, `Mapping`)
//! - record schemas (`FieldType`, `FieldSpec`, `FieldDefault`, `RecordType`)
//! - record instances (`Record`)

pub mod record;
pub mod schema;
pub mod value;

pub use record::*;
pub use schema::*;
pub use value::*;
