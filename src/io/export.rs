//! Sweep export for external runners.
//!
//! `write_sweep` writes one nested-form file per combination plus a
//! `manifest.json` listing every run with its flattened parameters, so a
//! driver script can iterate the runs without linking against this crate.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::{Mapping, Record};
use crate::error::{ParamError, Result};
use crate::io::codec::{write_record, Format};
use crate::projection::to_flattened_mapping;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize)]
pub struct SweepManifest {
    pub generated_at: DateTime<Utc>,
    pub record_type: String,
    pub format: Format,
    pub separator: String,
    pub count: usize,
    pub runs: Vec<SweepRun>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepRun {
    pub index: usize,
    /// File name relative to the sweep directory.
    pub file: String,
    /// Flattened parameters of this run.
    pub params: Mapping,
}

/// Write `records` (the output of `get_settings`) into `dir`.
///
/// The directory is created if needed; existing files with the same names are
/// overwritten.
pub fn write_sweep(
    dir: &Path,
    records: &[Record],
    format: Format,
    sep: &str,
) -> Result<SweepManifest> {
    fs::create_dir_all(dir).map_err(|e| ParamError::io(dir, e))?;

    let width = records.len().to_string().len().max(4);
    let mut runs = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let file = format!("run-{index:0width$}.{}", format.extension());
        write_record(&dir.join(&file), record, Some(format))?;
        runs.push(SweepRun {
            index,
            file,
            params: to_flattened_mapping(record, sep)?,
        });
    }

    let manifest = SweepManifest {
        generated_at: Utc::now(),
        record_type: records.first().map(|r| r.type_name().to_string()).unwrap_or_default(),
        format,
        separator: sep.to_string(),
        count: runs.len(),
        runs,
    };

    let path = manifest_path(dir);
    let text = serde_json::to_string_pretty(&manifest).map_err(|e| ParamError::Format {
        format: "JSON",
        message: e.to_string(),
    })?;
    fs::write(&path, text).map_err(|e| ParamError::io(&path, e))?;

    debug!(dir = %dir.display(), runs = manifest.count, "wrote sweep");
    Ok(manifest)
}

pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILE)
}
