//! Union disambiguation.
//!
//! When a field is declared as a union of several types, raw (mapping-form)
//! input does not say which one it is. Record types carry a registry of
//! resolvers keyed by the exact set of candidates; reconstruction consults it
//! whenever the value itself cannot settle the question.
//!
//! Lookup order for a union on a field of record type `R`:
//!
//! 1. `R`, then `R`'s ancestors (nearest first)
//! 2. the record types enclosing `R` in the current reconstruction, innermost
//!    first, each followed by its ancestors
//!
//! The root type therefore works as a fallback registry for every nested union.

pub mod registry;

pub use registry::*;

use tracing::trace;

use crate::domain::{FieldType, RecordType, Value};
use crate::error::{ParamError, Result};

/// Narrow `value` to exactly one of `candidates`.
///
/// `scopes` lists the record types to search for a registry entry, innermost
/// first (the declaring type, then its enclosing types). `path` names the field
/// for error messages.
pub fn resolve_union(
    scopes: &[&RecordType],
    path: &str,
    candidates: &[FieldType],
    value: &Value,
) -> Result<FieldType> {
    if let Some(found) = fast_path(candidates, value) {
        trace!(path, resolved = %found, "union resolved from value");
        return Ok(found);
    }

    let key = UnionKey::of(candidates);
    let union = FieldType::union(candidates.iter().cloned());

    let resolver = scopes
        .iter()
        .flat_map(|scope| scope.lineage())
        .find_map(|ty| ty.disambiguators().get(&key).map(|r| (ty.name(), r)));

    let Some((owner, resolver)) = resolver else {
        return Err(ParamError::TypeResolution {
            path: path.to_string(),
            union: union.to_string(),
            reason: format!(
                "no disambiguator registered for {key} and the value ({}) is ambiguous",
                value.describe()
            ),
        });
    };

    match resolver(value, candidates) {
        Some(found) if candidates.contains(&found) => {
            trace!(path, registry = owner, resolved = %found, "union resolved by registry");
            Ok(found)
        }
        Some(found) => Err(ParamError::TypeResolution {
            path: path.to_string(),
            union: union.to_string(),
            reason: format!("disambiguator of {owner} returned {found}, which is not a candidate"),
        }),
        None => Err(ParamError::TypeResolution {
            path: path.to_string(),
            union: union.to_string(),
            reason: format!("disambiguator of {owner} gave no verdict"),
        }),
    }
}

/// Settle the union from the value alone, when it is unambiguous.
///
/// Raw mappings never take this path while a record candidate exists: they
/// are record data without a type tag and need the registry.
fn fast_path(candidates: &[FieldType], value: &Value) -> Option<FieldType> {
    if let Value::Record(r) = value {
        let matches: Vec<&FieldType> = candidates
            .iter()
            .filter(|c| matches!(c, FieldType::Record(ty) if r.record_type().same_type(ty)))
            .collect();
        return single(matches);
    }

    let has_record_candidate = candidates.iter().any(|c| matches!(c, FieldType::Record(_)));
    if matches!(value, Value::Map(_)) && has_record_candidate {
        return None;
    }

    let strict: Vec<&FieldType> = candidates.iter().filter(|c| c.is_instance(value)).collect();
    if !strict.is_empty() {
        return single(strict);
    }

    // e.g. an int for Union[float, str]
    let widened: Vec<&FieldType> = candidates
        .iter()
        .filter(|c| c.coerce(value.clone(), "").is_ok())
        .collect();
    single(widened)
}

fn single(matches: Vec<&FieldType>) -> Option<FieldType> {
    match matches.as_slice() {
        [only] => Some((*only).clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::Mapping;

    fn adam() -> Arc<RecordType> {
        RecordType::builder("Adam").field("lr", FieldType::Float, 0.001).build()
    }

    fn sgd() -> Arc<RecordType> {
        RecordType::builder("Sgd")
            .field("lr", FieldType::Float, 0.01)
            .field("momentum", FieldType::Float, 0.9)
            .build()
    }

    fn raw(pairs: &[(&str, Value)]) -> Value {
        Value::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect::<Mapping>())
    }

    #[test]
    fn registry_resolves_by_distinguishing_key() {
        let (a, s) = (adam(), sgd());
        let candidates = vec![FieldType::record(&a), FieldType::record(&s)];
        let owner = RecordType::builder("Experiment")
            .disambiguator(candidates.clone(), by_field("momentum", &s, &a))
            .build();

        let with = raw(&[("momentum", Value::Float(0.1))]);
        let without = raw(&[("lr", Value::Float(0.1))]);
        let resolve = |v: &Value| resolve_union(&[&owner], "optimizer", &candidates, v).unwrap();
        assert_eq!(resolve(&with), FieldType::record(&s));
        assert_eq!(resolve(&without), FieldType::record(&a));
    }

    #[test]
    fn registry_key_ignores_candidate_order() {
        let (a, s) = (adam(), sgd());
        let owner = RecordType::builder("Experiment")
            .disambiguator(
                vec![FieldType::record(&s), FieldType::record(&a)],
                by_field("momentum", &s, &a),
            )
            .build();
        let candidates = vec![FieldType::record(&a), FieldType::record(&s)];
        let v = raw(&[]);
        let resolved = resolve_union(&[&owner], "opt", &candidates, &v).unwrap();
        assert_eq!(resolved, FieldType::record(&a));
    }

    #[test]
    fn record_instances_take_the_fast_path() {
        let (a, s) = (adam(), sgd());
        let owner = RecordType::builder("Experiment").build();
        let candidates = vec![FieldType::record(&a), FieldType::record(&s)];
        let v = Value::Record(s.instance().unwrap());
        let resolved = resolve_union(&[&owner], "opt", &candidates, &v).unwrap();
        assert_eq!(resolved, FieldType::record(&s));
    }

    #[test]
    fn raw_mapping_without_registry_is_an_error() {
        let (a, s) = (adam(), sgd());
        let owner = RecordType::builder("Experiment").build();
        let candidates = vec![FieldType::record(&a), FieldType::record(&s)];
        let err = resolve_union(&[&owner], "optimizer", &candidates, &raw(&[])).unwrap_err();
        match err {
            ParamError::TypeResolution { path, union, .. } => {
                assert_eq!(path, "optimizer");
                assert_eq!(union, "Union[Adam, Sgd]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ancestor_and_enclosing_registries_are_searched() {
        let (a, s) = (adam(), sgd());
        let candidates = vec![FieldType::record(&a), FieldType::record(&s)];
        let base = RecordType::builder("Base")
            .disambiguator(candidates.clone(), by_field("momentum", &s, &a))
            .build();
        let derived = RecordType::builder("Derived").extends(&base).build();
        let inner = RecordType::builder("Inner").build();

        let v = raw(&[("momentum", Value::Float(0.5))]);
        assert!(resolve_union(&[&derived], "opt", &candidates, &v).is_ok());
        assert!(resolve_union(&[&inner, &derived], "inner.opt", &candidates, &v).is_ok());
        assert!(resolve_union(&[&inner], "inner.opt", &candidates, &v).is_err());
    }

    #[test]
    fn scalar_unions() {
        let owner = RecordType::builder("Owner").build();
        let int_or_str = vec![FieldType::Int, FieldType::Str];
        let resolved = resolve_union(&[&owner], "x", &int_or_str, &Value::Int(3)).unwrap();
        assert_eq!(resolved, FieldType::Int);

        let float_or_str = vec![FieldType::Float, FieldType::Str];
        let resolved = resolve_union(&[&owner], "x", &float_or_str, &Value::Int(3)).unwrap();
        assert_eq!(resolved, FieldType::Float);

        // Same value fits both candidates: fail closed.
        let any_or_int = vec![FieldType::Any, FieldType::Int];
        assert!(resolve_union(&[&owner], "x", &any_or_int, &Value::Int(3)).is_err());
    }

    #[test]
    fn verdict_outside_the_union_is_rejected() {
        let (a, s) = (adam(), sgd());
        let candidates = vec![FieldType::record(&a), FieldType::record(&s)];
        let owner = RecordType::builder("Experiment")
            .disambiguator(candidates.clone(), |_, _| Some(FieldType::Int))
            .build();
        assert!(resolve_union(&[&owner], "opt", &candidates, &raw(&[])).is_err());
    }
}
