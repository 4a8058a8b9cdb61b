//! `param-tree` library crate.
//!
//! Typed parameter trees: records with declared fields and defaults that
//! project to nested or flattened mappings and back, mark fields as sweeps
//! (`Settings`) and expand them, and build objects from a `type` discriminator.
//!
//! The binary (`params`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the record model, projection, sweep and instantiation layers are reusable
//!   from other programs

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod disambiguate;
pub mod domain;
pub mod error;
pub mod instantiate;
pub mod io;
pub mod projection;
pub mod report;
pub mod sweep;
