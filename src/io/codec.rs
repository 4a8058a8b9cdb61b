//! JSON/YAML text <-> `Mapping`.
//!
//! Mapping keys are always strings. YAML allows integer or boolean keys; they
//! are stringified on read (`1: a` becomes `"1": a`), so such a document does
//! not round-trip byte for byte.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{Mapping, Record, RecordType, Value};
use crate::error::{ParamError, Result};
use crate::projection::{from_nested_mapping, to_nested_mapping};

/// Text formats understood by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

impl Format {
    /// Guess the format from a file extension (`.json`, `.yaml`, `.yml`).
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Format::Json => "JSON",
            Format::Yaml => "YAML",
        }
    }
}

/// Parse a document whose top level is a mapping. A null document (`~`) is an
/// empty mapping.
pub fn parse_mapping(text: &str, format: Format) -> Result<Mapping> {
    let value: Value = match format {
        Format::Json => serde_json::from_str(text).map_err(|e| format_error(format, e))?,
        Format::Yaml => serde_yaml::from_str(text).map_err(|e| format_error(format, e))?,
    };
    match value {
        Value::Map(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        other => Err(ParamError::Format {
            format: format.label(),
            message: format!("top level must be a mapping, found {}", other.kind()),
        }),
    }
}

pub fn render_mapping(mapping: &Mapping, format: Format) -> Result<String> {
    match format {
        Format::Json => serde_json::to_string_pretty(mapping).map_err(|e| format_error(format, e)),
        Format::Yaml => serde_yaml::to_string(mapping).map_err(|e| format_error(format, e)),
    }
}

/// Read a mapping from `path`; the format comes from the extension unless given.
pub fn load_mapping(path: &Path, format: Option<Format>) -> Result<Mapping> {
    let format = resolve_format(path, format)?;
    let text = fs::read_to_string(path).map_err(|e| ParamError::io(path, e))?;
    parse_mapping(&text, format)
}

pub fn write_mapping(path: &Path, mapping: &Mapping, format: Option<Format>) -> Result<()> {
    let format = resolve_format(path, format)?;
    let mut text = render_mapping(mapping, format)?;
    if !text.ends_with('\n') {
        text.push('\n');
    }
    fs::write(path, text).map_err(|e| ParamError::io(path, e))
}

/// Load a nested-form document as a record of type `ty`.
pub fn load_record(path: &Path, ty: &Arc<RecordType>, format: Option<Format>) -> Result<Record> {
    let mapping = load_mapping(path, format)?;
    from_nested_mapping(ty, &mapping)
}

pub fn write_record(path: &Path, record: &Record, format: Option<Format>) -> Result<()> {
    write_mapping(path, &to_nested_mapping(record), format)
}

fn resolve_format(path: &Path, format: Option<Format>) -> Result<Format> {
    format.or_else(|| Format::from_path(path)).ok_or_else(|| ParamError::Format {
        format: "input",
        message: format!(
            "cannot tell the format of '{}' (use a .json/.yaml extension or pass a format)",
            path.display()
        ),
    })
}

fn format_error(format: Format, err: impl std::fmt::Display) -> ParamError {
    ParamError::Format {
        format: format.label(),
        message: err.to_string(),
    }
}
