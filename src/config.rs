//! Run configuration for the `params` binary.
//!
//! `RunConfig` is derived from parsed CLI arguments (see
//! `app::run_config_from_args`); flags can also come from the environment or a
//! `.env` file:
//!
//! - `PARAMS_SEPARATOR`: flattening separator (default `.`)
//! - `PARAMS_FORMAT`: output format, `json` or `yaml` (default `yaml`)
//! - `PARAMS_MAX_COMBINATIONS`: sweep size limit (default 10000)

use std::path::PathBuf;

use crate::domain::Value;
use crate::error::AppError;
use crate::io::Format;
use crate::projection::DEFAULT_SEPARATOR;

pub const DEFAULT_RECORD_TYPE: &str = "Experiment";
pub const DEFAULT_MAX_COMBINATIONS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Catalog record type to load the input as.
    pub record_type: String,
    /// Nested-form config file; catalog defaults when absent.
    pub input: Option<PathBuf>,
    pub input_format: Option<Format>,
    pub output_format: Format,
    pub separator: String,
    /// `--set KEY=VALUE` overrides, by flattened key.
    pub sets: Vec<(String, Value)>,
    /// `--grid KEY=V1,V2,...` sweep axes, by flattened key.
    pub grid: Vec<(String, Vec<Value>)>,
    /// `--arg NAME=VALUE` constructor overrides (flattened keys reach nested targets).
    pub args: Vec<(String, Value)>,
    pub max_combinations: usize,
    /// Export directory for `sweep --out`.
    pub out_dir: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            record_type: DEFAULT_RECORD_TYPE.to_string(),
            input: None,
            input_format: None,
            output_format: Format::Yaml,
            separator: DEFAULT_SEPARATOR.to_string(),
            sets: Vec::new(),
            grid: Vec::new(),
            args: Vec::new(),
            max_combinations: DEFAULT_MAX_COMBINATIONS,
            out_dir: None,
        }
    }
}

/// Parse `KEY=VALUE`; the value is read as a YAML scalar or flow collection.
pub fn parse_assignment(text: &str) -> Result<(String, Value), AppError> {
    let (key, raw) = split_assignment(text)?;
    Ok((key, parse_scalar(raw)))
}

/// Parse `KEY=V1,V2,...` into a sweep axis.
///
/// Commas inside brackets, braces or quotes do not split, so
/// `model.hidden=[8,4],[16]` has two candidates.
pub fn parse_grid(text: &str) -> Result<(String, Vec<Value>), AppError> {
    let (key, raw) = split_assignment(text)?;
    if raw.trim().is_empty() {
        return Err(AppError::new(2, format!("Grid '{key}' has no candidates.")));
    }
    let parts = split_top_level(raw).ok_or_else(|| {
        AppError::new(2, format!("Grid '{key}' has unbalanced brackets or quotes."))
    })?;
    Ok((key, parts.into_iter().map(parse_scalar).collect()))
}

/// `1` -> int, `0.5` -> float, `true` -> bool, `null` -> null, `[1, 2]` -> list,
/// anything unparsable -> string.
pub fn parse_scalar(raw: &str) -> Value {
    let raw = raw.trim();
    serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::Str(raw.to_string()))
}

fn split_top_level(raw: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in raw.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') if raw[start..i].trim().is_empty() => quote = Some(ch),
            (None, '[' | '{') => depth += 1,
            (None, ']' | '}') => depth = depth.checked_sub(1)?,
            (None, ',') if depth == 0 => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    parts.push(&raw[start..]);
    Some(parts)
}

fn split_assignment(text: &str) -> Result<(String, &str), AppError> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value)),
        _ => Err(AppError::new(2, format!("Expected KEY=VALUE, got '{text}'."))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_parse_typed_values() {
        assert_eq!(parse_assignment("seed=3").unwrap(), ("seed".to_string(), Value::Int(3)));
        assert_eq!(
            parse_assignment("optimizer.lr = 0.1").unwrap(),
            ("optimizer.lr".to_string(), Value::Float(0.1))
        );
        assert_eq!(
            parse_assignment("model.hidden=[8, 4]").unwrap().1,
            Value::from(vec![8, 4])
        );
        assert_eq!(parse_assignment("name=run a").unwrap().1, Value::from("run a"));
        assert_eq!(parse_assignment("model.dropout=null").unwrap().1, Value::Null);
    }

    #[test]
    fn malformed_assignments_are_usage_errors() {
        assert_eq!(parse_assignment("seed").unwrap_err().exit_code(), 2);
        assert_eq!(parse_assignment("=3").unwrap_err().exit_code(), 2);
        assert_eq!(parse_grid("seed=").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn grid_splits_candidates() {
        let (key, values) = parse_grid("trainer.epochs=5,10,20").unwrap();
        assert_eq!(key, "trainer.epochs");
        assert_eq!(values, vec![Value::Int(5), Value::Int(10), Value::Int(20)]);
    }

    #[test]
    fn grid_keeps_flow_lists_whole() {
        let (_, values) = parse_grid("model.hidden=[8,4],[16]").unwrap();
        assert_eq!(values, vec![Value::from(vec![8, 4]), Value::from(vec![16])]);

        let (_, values) = parse_grid("name='a,b',c").unwrap();
        assert_eq!(values, vec![Value::from("a,b"), Value::from("c")]);

        let (_, values) = parse_grid("name=it's,ok").unwrap();
        assert_eq!(values, vec![Value::from("it's"), Value::from("ok")]);

        assert_eq!(parse_grid("model.hidden=[8,4").unwrap_err().exit_code(), 2);
    }
}
