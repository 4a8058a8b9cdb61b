//! Settings slot discovery and combination counting.

use std::fmt;

use crate::domain::{Record, Value};
use crate::error::{ParamError, Result};

/// One step of a path from the root record to a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) | PathSegment::Key(name) => write!(f, "{name}"),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// A tree position holding `Settings`.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSlot {
    pub path: Vec<PathSegment>,
    /// Number of concrete values this slot contributes (candidates that hold
    /// `Settings` themselves count once per expansion).
    pub candidates: usize,
}

impl SettingsSlot {
    /// Path joined with `sep`.
    ///
    /// Equals the flattened key only when every step goes through records; a
    /// slot inside a plain list or map (`model.hidden.1`) sits within an opaque
    /// flattened leaf and has no key of its own.
    pub fn key(&self, sep: &str) -> String {
        let parts: Vec<String> = self.path.iter().map(ToString::to_string).collect();
        parts.join(sep)
    }

    /// The value at this slot's position in `record`, or in any expanded
    /// combination of it.
    pub fn value_in<'a>(&self, record: &'a Record) -> Option<&'a Value> {
        let (PathSegment::Field(first), rest) = self.path.split_first()? else {
            return None;
        };
        let mut value = record.get(first)?;
        for segment in rest {
            value = match (segment, value) {
                (PathSegment::Field(name), Value::Record(r)) => r.get(name)?,
                (PathSegment::Index(i), Value::List(items)) => items.get(*i)?,
                (PathSegment::Key(k), Value::Map(map)) => map.get(k)?,
                _ => return None,
            };
        }
        Some(value)
    }
}

/// Every `Settings` position in `record`, depth-first in declaration order.
///
/// Slots nested inside a `Settings` candidate are not listed separately; they
/// are folded into the enclosing slot's candidate count.
pub fn collect_slots(record: &Record) -> Result<Vec<SettingsSlot>> {
    let mut slots = Vec::new();
    let mut path = Vec::new();
    walk_record(record, &mut path, &mut slots)?;
    Ok(slots)
}

/// Number of concrete records `get_settings` will produce.
///
/// Fails on an empty `Settings` list or when the count overflows `usize`.
pub fn count_combinations(record: &Record) -> Result<usize> {
    count_record(record, "")
}

fn walk_record(
    record: &Record,
    path: &mut Vec<PathSegment>,
    slots: &mut Vec<SettingsSlot>,
) -> Result<()> {
    for (name, value) in record.iter() {
        path.push(PathSegment::Field(name.to_string()));
        walk_value(value, path, slots)?;
        path.pop();
    }
    Ok(())
}

fn walk_value(
    value: &Value,
    path: &mut Vec<PathSegment>,
    slots: &mut Vec<SettingsSlot>,
) -> Result<()> {
    match value {
        Value::Settings(_) => {
            let candidates = count_value(value, &display_path(path))?;
            slots.push(SettingsSlot {
                path: path.clone(),
                candidates,
            });
        }
        Value::Record(r) => walk_record(r, path, slots)?,
        Value::List(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(i));
                walk_value(item, path, slots)?;
                path.pop();
            }
        }
        Value::Map(map) => {
            for (k, v) in map {
                path.push(PathSegment::Key(k.clone()));
                walk_value(v, path, slots)?;
                path.pop();
            }
        }
        _ => {}
    }
    Ok(())
}

fn display_path(path: &[PathSegment]) -> String {
    let parts: Vec<String> = path.iter().map(ToString::to_string).collect();
    parts.join(".")
}

fn count_record(record: &Record, path: &str) -> Result<usize> {
    record.iter().try_fold(1usize, |acc, (name, value)| {
        let n = count_value(value, &crate::domain::join_path(path, name))?;
        checked_mul(acc, n)
    })
}

fn count_value(value: &Value, path: &str) -> Result<usize> {
    match value {
        Value::Settings(candidates) => {
            if candidates.is_empty() {
                return Err(ParamError::EmptySettings { path: path.to_string() });
            }
            candidates.iter().try_fold(0usize, |acc, c| {
                let n = count_value(c, path)?;
                acc.checked_add(n).ok_or_else(overflow)
            })
        }
        Value::Record(r) => count_record(r, path),
        Value::List(items) => items.iter().enumerate().try_fold(1usize, |acc, (i, item)| {
            let n = count_value(item, &crate::domain::join_path(path, &i.to_string()))?;
            checked_mul(acc, n)
        }),
        Value::Map(map) => map.iter().try_fold(1usize, |acc, (k, v)| {
            let n = count_value(v, &crate::domain::join_path(path, k))?;
            checked_mul(acc, n)
        }),
        _ => Ok(1),
    }
}

fn checked_mul(acc: usize, n: usize) -> Result<usize> {
    acc.checked_mul(n).ok_or_else(overflow)
}

fn overflow() -> ParamError {
    ParamError::TooManyCombinations {
        count: format!("more than {}", usize::MAX),
        limit: usize::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::domain::Settings;

    #[test]
    fn slots_are_listed_depth_first() {
        let catalog = Catalog::builtin();
        let mut r = catalog.record_type("Experiment").unwrap().instance().unwrap();
        r["seed"] = Value::Settings(Settings::new([1, 2]));
        r["trainer"]
            .as_record_mut()
            .unwrap()
            .set("epochs", Settings::new([5, 10, 20]))
            .unwrap();

        let slots = collect_slots(&r).unwrap();
        let keys: Vec<String> = slots.iter().map(|s| s.key(".")).collect();
        assert_eq!(keys, vec!["seed", "trainer.epochs"]);
        assert_eq!(slots[1].candidates, 3);
        assert_eq!(count_combinations(&r).unwrap(), 6);
    }

    #[test]
    fn slots_inside_plain_lists_resolve_by_position() {
        let catalog = Catalog::builtin();
        let mut r = catalog.record_type("Experiment").unwrap().instance().unwrap();
        r["model"]
            .as_record_mut()
            .unwrap()
            .set(
                "hidden",
                Value::from(vec![Value::Int(8), Value::Settings(Settings::new([4, 16]))]),
            )
            .unwrap();

        let slots = collect_slots(&r).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].key("."), "model.hidden.1");
        assert_eq!(slots[0].value_in(&r), Some(&Value::Settings(Settings::new([4, 16]))));

        let expanded = r.get_settings().unwrap();
        assert_eq!(slots[0].value_in(&expanded[1]), Some(&Value::Int(16)));
    }

    #[test]
    fn record_candidates_count_their_own_expansions() {
        let catalog = Catalog::builtin();
        let mut sgd = catalog.record_type("Sgd").unwrap().instance().unwrap();
        sgd.set("momentum", Settings::new([0.0, 0.5, 0.9])).unwrap();
        let adam = catalog.record_type("Adam").unwrap().instance().unwrap();

        let mut r = catalog.record_type("Experiment").unwrap().instance().unwrap();
        r["optimizer"] = Value::Settings(Settings::new([adam, sgd]));

        let slots = collect_slots(&r).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].candidates, 4);
    }

    #[test]
    fn empty_settings_are_rejected() {
        let catalog = Catalog::builtin();
        let mut r = catalog.record_type("Trainer").unwrap().instance().unwrap();
        r["epochs"] = Value::Settings(Settings::default());
        let err = count_combinations(&r).unwrap_err();
        assert!(matches!(err, ParamError::EmptySettings { ref path } if path == "epochs"));
    }

    #[test]
    fn settings_free_record_has_one_combination() {
        let catalog = Catalog::builtin();
        let r = catalog.record_type("Experiment").unwrap().instance().unwrap();
        assert!(collect_slots(&r).unwrap().is_empty());
        assert_eq!(count_combinations(&r).unwrap(), 1);
    }
}
