//! Disambiguator registry and stock resolvers.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::domain::{FieldType, RecordType, Value};

/// Resolver: `(raw value, candidates) -> concrete candidate`, or `None` when
/// the value's shape does not decide it. Must be pure and deterministic.
pub type Resolver = Arc<dyn Fn(&Value, &[FieldType]) -> Option<FieldType> + Send + Sync>;

/// Registry key: the unordered set of candidate type names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnionKey(BTreeSet<String>);

impl UnionKey {
    pub fn of(candidates: &[FieldType]) -> Self {
        Self(candidates.iter().map(ToString::to_string).collect())
    }
}

impl fmt::Display for UnionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(String::as_str).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[derive(Clone, Default)]
pub struct DisambiguatorRegistry {
    entries: Vec<(UnionKey, Resolver)>,
}

impl DisambiguatorRegistry {
    /// Register `resolver` for `candidates`, replacing any previous entry for
    /// the same set.
    pub fn register(&mut self, candidates: Vec<FieldType>, resolver: Resolver) {
        let key = UnionKey::of(&candidates);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = resolver,
            None => self.entries.push((key, resolver)),
        }
    }

    pub fn get(&self, key: &UnionKey) -> Option<&Resolver> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    pub fn keys(&self) -> impl Iterator<Item = &UnionKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for DisambiguatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

/// Pick `present` when the raw mapping has `key`, `absent` otherwise.
///
/// This is the usual case of two record types where only one declares a field
/// (e.g. SGD has `momentum`, Adam does not).
pub fn by_field(
    key: &str,
    present: &Arc<RecordType>,
    absent: &Arc<RecordType>,
) -> impl Fn(&Value, &[FieldType]) -> Option<FieldType> + Send + Sync + 'static {
    let key = key.to_string();
    let present = FieldType::record(present);
    let absent = FieldType::record(absent);
    move |value: &Value, _: &[FieldType]| match value {
        Value::Map(map) if map.contains_key(&key) => Some(present.clone()),
        Value::Map(_) => Some(absent.clone()),
        _ => None,
    }
}

/// Pick a record type by the string stored under `key`.
pub fn by_tag(
    key: &str,
    tags: &[(&str, &Arc<RecordType>)],
) -> impl Fn(&Value, &[FieldType]) -> Option<FieldType> + Send + Sync + 'static {
    let key = key.to_string();
    let tags: Vec<(String, FieldType)> = tags
        .iter()
        .map(|(tag, ty)| (tag.to_string(), FieldType::record(ty)))
        .collect();
    move |value: &Value, _: &[FieldType]| {
        let tag = value.as_map()?.get(&key)?.as_str()?;
        tags.iter().find(|(t, _)| t == tag).map(|(_, ty)| ty.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Mapping;

    #[test]
    fn register_replaces_same_key() {
        let mut reg = DisambiguatorRegistry::default();
        reg.register(
            vec![FieldType::Int, FieldType::Str],
            Arc::new(|_: &Value, _: &[FieldType]| Some(FieldType::Int)),
        );
        reg.register(
            vec![FieldType::Str, FieldType::Int],
            Arc::new(|_: &Value, _: &[FieldType]| Some(FieldType::Str)),
        );
        assert_eq!(reg.len(), 1);

        let resolver = reg.get(&UnionKey::of(&[FieldType::Int, FieldType::Str])).unwrap();
        assert_eq!(resolver(&Value::Null, &[]), Some(FieldType::Str));
    }

    #[test]
    fn by_tag_reads_the_tag_field() {
        let mlp = RecordType::builder("Mlp").build();
        let cnn = RecordType::builder("Cnn").build();
        let resolve = by_tag("kind", &[("mlp", &mlp), ("cnn", &cnn)]);

        let mut map = Mapping::new();
        map.insert("kind".into(), Value::from("cnn"));
        assert_eq!(resolve(&Value::Map(map), &[]), Some(FieldType::record(&cnn)));
        assert_eq!(resolve(&Value::Int(1), &[]), None);
    }
}
