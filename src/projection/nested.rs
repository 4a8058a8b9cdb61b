//! Record tree <-> nested mapping.
//!
//! Records are the only structural axis: a record becomes a mapping of its
//! fields, lists and mappings keep their shape, `Settings` become the
//! `{"$settings": [...]}` marker, and every other value is copied as is.
//!
//! The inverse walks the declared schema, not the data: each declared field is
//! looked up in the mapping and structured against its declared type.

use std::sync::Arc;

use crate::disambiguate::resolve_union;
use crate::domain::{
    join_path, settings_marker, FieldType, Mapping, Record, RecordType, Settings, Value,
    SETTINGS_KEY,
};
use crate::error::{ParamError, Result};

/// Nested mapping of `record`'s fields, in declaration order.
pub fn to_nested_mapping(record: &Record) -> Mapping {
    record
        .iter()
        .map(|(name, value)| (name.to_string(), to_nested_value(value)))
        .collect()
}

/// Mapping form of a single value.
pub fn to_nested_value(value: &Value) -> Value {
    match value {
        Value::Record(r) => Value::Map(to_nested_mapping(r)),
        Value::List(items) => Value::List(items.iter().map(to_nested_value).collect()),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), to_nested_value(v)))
                .collect(),
        ),
        Value::Settings(settings) => {
            let mut marker = Mapping::new();
            marker.insert(
                SETTINGS_KEY.to_string(),
                Value::List(settings.iter().map(to_nested_value).collect()),
            );
            Value::Map(marker)
        }
        other => other.clone(),
    }
}

/// Rebuild a record of type `ty` from its nested mapping form.
///
/// Absent keys take the field default; keys that name no field are rejected.
pub fn from_nested_mapping(ty: &Arc<RecordType>, mapping: &Mapping) -> Result<Record> {
    Reconstructor::default().record(ty, mapping, "")
}

/// Tracks the chain of record types being rebuilt, innermost last, so union
/// fields can fall back to the registries of enclosing types.
#[derive(Default)]
struct Reconstructor {
    stack: Vec<Arc<RecordType>>,
}

impl Reconstructor {
    fn record(&mut self, ty: &Arc<RecordType>, mapping: &Mapping, path: &str) -> Result<Record> {
        self.stack.push(Arc::clone(ty));
        let result = self.fields(ty, mapping, path);
        self.stack.pop();
        result
    }

    fn fields(&mut self, ty: &Arc<RecordType>, mapping: &Mapping, path: &str) -> Result<Record> {
        if let Some(unknown) = mapping.keys().find(|k| ty.field(k).is_none()) {
            return Err(ParamError::field(
                join_path(path, unknown),
                format!("{} has no field named '{unknown}'", ty.name()),
            ));
        }

        let mut args = Mapping::new();
        for field in ty.fields() {
            let Some(raw) = mapping.get(field.name()) else {
                continue;
            };
            let field_path = join_path(path, field.name());
            let value = self.structure(field.ty(), raw, &field_path)?;
            args.insert(field.name().to_string(), value);
        }
        ty.construct_at(args, path)
    }

    fn structure(&mut self, ty: &FieldType, raw: &Value, path: &str) -> Result<Value> {
        match raw {
            Value::Settings(candidates) => return self.settings(ty, candidates, path),
            Value::Map(map) => {
                if let Some(candidates) = settings_marker(map) {
                    return self.settings(ty, candidates, path);
                }
            }
            _ => {}
        }

        match ty {
            FieldType::Any => Ok(restore_settings(raw)),
            FieldType::Record(record_ty) => match raw {
                Value::Map(map) => Ok(Value::Record(self.record(record_ty, map, path)?)),
                Value::Record(r) if r.record_type().same_type(record_ty) => Ok(raw.clone()),
                other => Err(ParamError::validation(path, record_ty.name(), other.describe())),
            },
            FieldType::Union(candidates) => {
                let resolved = {
                    let scopes: Vec<&RecordType> =
                        self.stack.iter().rev().map(|t| t.as_ref()).collect();
                    resolve_union(&scopes, path, candidates, raw)?
                };
                self.structure(&resolved, raw, path)
            }
            FieldType::Optional(_) if raw.is_null() => Ok(Value::Null),
            FieldType::Optional(inner) => self.structure(inner, raw, path),
            FieldType::List(inner) => {
                let mismatch = || ParamError::validation(path, ty.to_string(), raw.describe());
                let items: Vec<&Value> = match raw {
                    Value::List(items) => items.iter().collect(),
                    Value::Map(map) => indexed_items(map).ok_or_else(mismatch)?,
                    _ => return Err(mismatch()),
                };
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| self.structure(inner, item, &join_path(path, &i.to_string())))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List)
            }
            FieldType::Map(inner) => match raw {
                Value::Map(map) => map
                    .iter()
                    .map(|(k, v)| -> Result<(String, Value)> {
                        Ok((k.clone(), self.structure(inner, v, &join_path(path, k))?))
                    })
                    .collect::<Result<Mapping>>()
                    .map(Value::Map),
                other => Err(ParamError::validation(path, ty.to_string(), other.describe())),
            },
            scalar => scalar.coerce(raw.clone(), path),
        }
    }

    fn settings(&mut self, ty: &FieldType, candidates: &[Value], path: &str) -> Result<Value> {
        candidates
            .iter()
            .map(|candidate| self.structure(ty, candidate, path))
            .collect::<Result<Settings>>()
            .map(Value::Settings)
    }
}

/// Untyped values: turn `$settings` markers at any depth back into `Settings`.
fn restore_settings(raw: &Value) -> Value {
    match raw {
        Value::Map(map) => match settings_marker(map) {
            Some(candidates) => Value::Settings(candidates.iter().map(restore_settings).collect()),
            None => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), restore_settings(v)))
                    .collect(),
            ),
        },
        Value::List(items) => Value::List(items.iter().map(restore_settings).collect()),
        other => other.clone(),
    }
}

/// Items of a mapping keyed `"0".."n-1"` (a flattened list), in index order.
fn indexed_items(map: &Mapping) -> Option<Vec<&Value>> {
    let mut slots: Vec<Option<&Value>> = vec![None; map.len()];
    for (k, v) in map {
        let i: usize = k.parse().ok()?;
        *slots.get_mut(i)? = Some(v);
    }
    slots.into_iter().collect()
}
