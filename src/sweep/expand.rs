//! Cartesian expansion of `Settings` into concrete records.
//!
//! Ordering convention: slots are taken depth-first in declaration order; the
//! first slot varies slowest and the last slot fastest. A candidate that holds
//! `Settings` itself is expanded first and its expansions take its place in
//! the candidate list.

use tracing::debug;

use crate::domain::{join_path, Record, Value};
use crate::error::{ParamError, Result};
use crate::sweep::slots::count_combinations;

/// All concrete records described by `record`.
///
/// A record without `Settings` expands to itself. Every output is an
/// independent copy with no `Settings` left at any depth.
pub fn get_settings(record: &Record) -> Result<Vec<Record>> {
    if !record.contains_settings() {
        return Ok(vec![record.clone()]);
    }
    let out = expand_record(record, "")?;
    debug!(record = record.type_name(), combinations = out.len(), "expanded settings");
    Ok(out)
}

/// Like [`get_settings`], but refuses to materialize more than `max` records.
pub fn get_settings_limited(record: &Record, max: usize) -> Result<Vec<Record>> {
    let count = count_combinations(record)?;
    if count > max {
        return Err(ParamError::TooManyCombinations {
            count: count.to_string(),
            limit: max,
        });
    }
    get_settings(record)
}

/// Cartesian product of `lists`; the first list varies slowest.
pub fn cartesian_product<T: Clone>(lists: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut result: Vec<Vec<T>> = vec![Vec::with_capacity(lists.len())];
    for list in lists {
        let mut next = Vec::with_capacity(result.len() * list.len());
        for prefix in &result {
            for item in list {
                let mut tuple = prefix.clone();
                tuple.push(item.clone());
                next.push(tuple);
            }
        }
        result = next;
    }
    result
}

fn expand_record(record: &Record, path: &str) -> Result<Vec<Record>> {
    if !record.contains_settings() {
        return Ok(vec![record.clone()]);
    }
    let per_field = record
        .iter()
        .map(|(name, value)| expand_value(value, &join_path(path, name)))
        .collect::<Result<Vec<_>>>()?;

    let ty = record.record_type();
    Ok(cartesian_product(&per_field)
        .into_iter()
        .map(|values| Record::from_parts(ty.clone(), values))
        .collect())
}

fn expand_value(value: &Value, path: &str) -> Result<Vec<Value>> {
    match value {
        Value::Settings(candidates) => {
            if candidates.is_empty() {
                return Err(ParamError::EmptySettings { path: path.to_string() });
            }
            let mut out = Vec::new();
            for candidate in candidates.iter() {
                out.extend(expand_value(candidate, path)?);
            }
            Ok(out)
        }
        Value::Record(r) => Ok(expand_record(r, path)?.into_iter().map(Value::Record).collect()),
        Value::List(items) if value.contains_settings() => {
            let per_item = items
                .iter()
                .enumerate()
                .map(|(i, item)| expand_value(item, &join_path(path, &i.to_string())))
                .collect::<Result<Vec<_>>>()?;
            Ok(cartesian_product(&per_item).into_iter().map(Value::List).collect())
        }
        Value::Map(map) if value.contains_settings() => {
            let keys: Vec<&String> = map.keys().collect();
            let per_entry = map
                .iter()
                .map(|(k, v)| expand_value(v, &join_path(path, k)))
                .collect::<Result<Vec<_>>>()?;
            Ok(cartesian_product(&per_entry)
                .into_iter()
                .map(|values| Value::Map(keys.iter().map(|k| (*k).clone()).zip(values).collect()))
                .collect())
        }
        other => Ok(vec![other.clone()]),
    }
}
