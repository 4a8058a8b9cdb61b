//! Record instances.
//!
//! A `Record` is its type plus one value per declared field, stored in a single
//! vector in declaration order. Map-style access (`record["lr"]`) and
//! attribute-style access (`record.get("lr")`, `record.set(..)`) both index
//! that vector, so they always observe the same storage.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use crate::domain::{RecordType, Value};
use crate::error::{ParamError, Result};

#[derive(Clone)]
pub struct Record {
    ty: Arc<RecordType>,
    values: Vec<Value>,
}

impl Record {
    /// Callers guarantee `values` lines up with `ty.fields()` and is validated.
    pub(crate) fn from_parts(ty: Arc<RecordType>, values: Vec<Value>) -> Self {
        debug_assert_eq!(ty.fields().len(), values.len());
        Self { ty, values }
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.ty.field_index(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.ty.fields().iter().map(|f| f.name())
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// `(field name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keys().zip(self.values.iter())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.ty.field_index(name).map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.ty.field_index(name).map(|i| &mut self.values[i])
    }

    /// Follow a path of field names through nested records.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let value = self.get(first)?;
        if rest.is_empty() {
            return Some(value);
        }
        value.as_record()?.get_path(rest)
    }

    /// Assign a field, validating against its declared type.
    ///
    /// Returns the previous value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<Value> {
        let index = self.ty.field_index(name).ok_or_else(|| {
            ParamError::field(name, format!("{} has no field named '{name}'", self.ty.name()))
        })?;
        let value = self.ty.fields()[index].ty().coerce(value.into(), name)?;
        Ok(std::mem::replace(&mut self.values[index], value))
    }

    /// True if any field at any depth holds a `Settings` value.
    pub fn contains_settings(&self) -> bool {
        self.values.iter().any(Value::contains_settings)
    }
}

impl Index<&str> for Record {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.get(name) {
            Some(v) => v,
            None => panic!("{} has no field named '{name}'", self.ty.name()),
        }
    }
}

impl IndexMut<&str> for Record {
    fn index_mut(&mut self, name: &str) -> &mut Value {
        let type_name = self.ty.name().to_string();
        match self.get_mut(name) {
            Some(v) => v,
            None => panic!("{type_name} has no field named '{name}'"),
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name() == other.ty.name() && self.values == other.values
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.ty.name())?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldType;

    fn adam() -> Arc<RecordType> {
        RecordType::builder("Adam")
            .field("lr", FieldType::Float, 0.001)
            .field("amsgrad", FieldType::Bool, false)
            .build()
    }

    #[test]
    fn map_and_attribute_access_share_storage() {
        let mut r = adam().instance().unwrap();
        r["lr"] = Value::Float(0.5);
        assert_eq!(r.get("lr"), Some(&Value::Float(0.5)));

        r.set("lr", 0.25).unwrap();
        assert_eq!(r["lr"], Value::Float(0.25));
        assert_eq!(r.iter().count(), 2);
    }

    #[test]
    fn set_validates() {
        let mut r = adam().instance().unwrap();
        assert!(r.set("amsgrad", "yes").is_err());
        assert!(r.set("nope", 1).is_err());
        assert_eq!(r.set("lr", 1).unwrap(), Value::Float(0.001));
        assert_eq!(r["lr"], Value::Float(1.0));
    }

    #[test]
    fn repr_is_deterministic() {
        let r = adam().instance().unwrap();
        assert_eq!(r.to_string(), "Adam(lr=0.001, amsgrad=false)");
    }

    #[test]
    fn get_path_descends_nested_records() {
        let inner = adam();
        let outer = RecordType::builder("Experiment").record("optimizer", &inner).build();
        let r = outer.instance().unwrap();
        assert_eq!(r.get_path(&["optimizer", "lr"]), Some(&Value::Float(0.001)));
        assert_eq!(r.get_path(&["optimizer", "missing"]), None);
    }

    #[test]
    #[should_panic(expected = "no field named")]
    fn index_panics_on_unknown_field() {
        let r = adam().instance().unwrap();
        let _ = &r["missing"];
    }
}
