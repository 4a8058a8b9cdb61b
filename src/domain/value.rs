//! Dynamic values stored in record fields.
//!
//! `Value` is the single currency of the crate: record fields hold values,
//! projections produce values, and the JSON/YAML adapter parses into values.
//! Records and `Settings` are values too, which is what makes the tree
//! recursive.

use std::fmt;
use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::domain::Record;

/// Insertion-ordered, string-keyed mapping.
pub type Mapping = IndexMap<String, Value>;

/// Key of the single-entry mapping that stands for a `Settings` value in
/// mapping form: `{"$settings": [a, b, c]}`.
pub const SETTINGS_KEY: &str = "$settings";

#[derive(Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(Mapping),
    Record(Record),
    Settings(Settings),
}

impl Value {
    /// Short kind name used in validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Settings(_) => "settings",
        }
    }

    /// Kind name, with the record type name for records.
    pub fn describe(&self) -> String {
        match self {
            Value::Record(r) => r.type_name().to_string(),
            other => other.kind().to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_settings(&self) -> Option<&Settings> {
        match self {
            Value::Settings(s) => Some(s),
            _ => None,
        }
    }

    /// True if a `Settings` value appears anywhere in this value.
    pub fn contains_settings(&self) -> bool {
        match self {
            Value::Settings(_) => true,
            Value::Record(r) => r.contains_settings(),
            Value::List(items) => items.iter().any(Value::contains_settings),
            Value::Map(map) => map.values().any(Value::contains_settings),
            _ => false,
        }
    }

    /// True if a record appears anywhere in this value (outside `Settings`).
    pub fn contains_record(&self) -> bool {
        match self {
            Value::Record(_) => true,
            Value::List(items) => items.iter().any(Value::contains_record),
            Value::Map(map) => map.values().any(Value::contains_record),
            _ => false,
        }
    }
}

/// Returns the candidates if `map` is a settings marker.
pub fn settings_marker(map: &Mapping) -> Option<&[Value]> {
    if map.len() != 1 {
        return None;
    }
    match map.get(SETTINGS_KEY) {
        Some(Value::List(items)) => Some(items),
        _ => None,
    }
}

/// Candidate values for one field, tried in order during expansion.
///
/// Behaves like a `Vec<Value>` for everything else.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Settings(Vec<Value>);

impl Settings {
    pub fn new<I, T>(candidates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self(candidates.into_iter().map(Into::into).collect())
    }

    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

impl Deref for Settings {
    type Target = Vec<Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Settings {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: Into<Value>> FromIterator<T> for Settings {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Settings::new(iter)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<Mapping> for Value {
    fn from(v: Mapping) -> Self {
        Value::Map(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl From<Settings> for Value {
    fn from(v: Settings) -> Self {
        Value::Settings(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => write_seq(f, items),
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Record(r) => write!(f, "{r}"),
            Value::Settings(s) => {
                write!(f, "Settings(")?;
                write_seq(f, s)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{v}")?;
    }
    write!(f, "]")
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Record(r) => {
                let mut out = serializer.serialize_map(Some(r.len()))?;
                for (k, v) in r.iter() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Settings(s) => {
                let mut out = serializer.serialize_map(Some(1))?;
                out.serialize_entry(SETTINGS_KEY, &**s)?;
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON/YAML value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(i64::try_from(v).map_or(Value::Float(v as f64), Value::Int))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::Str(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Mapping::new();
        while let Some((MapKey(k), v)) = access.next_entry::<MapKey, Value>()? {
            map.insert(k, v);
        }
        Ok(Value::Map(map))
    }
}

/// Mapping key that accepts any scalar and keeps its textual form.
///
/// YAML allows `1: foo` or `true: bar`; those keys come back as `"1"` and
/// `"true"`. This is lossy by design of the data model (string keys only).
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MapKeyVisitor)
    }
}

struct MapKeyVisitor;

impl<'de> Visitor<'de> for MapKeyVisitor {
    type Value = MapKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar mapping key")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<MapKey, E> {
        Ok(MapKey(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<MapKey, E> {
        Ok(MapKey("null".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_behaves_like_a_vec() {
        let mut s = Settings::new([1, 2]);
        s.push(Value::Int(3));
        assert_eq!(s.len(), 3);
        assert_eq!(s[2], Value::Int(3));
        assert_eq!(s.iter().filter_map(Value::as_i64).sum::<i64>(), 6);
    }

    #[test]
    fn settings_marker_requires_single_list_entry() {
        let mut map = Mapping::new();
        map.insert(SETTINGS_KEY.to_string(), Value::from(vec![1, 2]));
        assert_eq!(settings_marker(&map).map(<[Value]>::len), Some(2));

        map.insert("other".to_string(), Value::Null);
        assert!(settings_marker(&map).is_none());
    }

    #[test]
    fn display_keeps_floats_distinct_from_ints() {
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Int(1).to_string(), "1");
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "[\"a\", \"b\"]");
    }

    #[test]
    fn settings_serialize_as_marker() {
        let v = Value::Settings(Settings::new([0.1, 0.2]));
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"$settings":[0.1,0.2]}"#);
    }

    #[test]
    fn yaml_scalar_keys_become_strings() {
        let v: Value = serde_yaml::from_str("1: one\ntrue: yes\nname: x\n").unwrap();
        let map = v.as_map().unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["1", "true", "name"]);
    }
}
