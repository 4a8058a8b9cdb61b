//! Record tree <-> flattened mapping.
//!
//! Keys are field paths joined by a separator (`.` by default):
//!
//! - nested records are always traversed
//! - lists and mappings are traversed only when they hold records; the element
//!   index or map key becomes a path segment
//! - any other value (scalars, plain containers, `Settings` markers,
//!   third-party markers such as `{"grid_search": [...]}`) is an opaque leaf
//! - a record with no fields is the leaf `{}`, so it is not lost

use std::sync::Arc;

use indexmap::IndexMap;

use crate::domain::{Mapping, Record, RecordType, Value};
use crate::error::{ParamError, Result};
use crate::projection::nested::{from_nested_mapping, to_nested_value};

pub const DEFAULT_SEPARATOR: &str = ".";

/// Flatten `record` into `path -> leaf` entries, depth-first in declaration order.
///
/// Fails if two distinct paths join to the same key (e.g. a field literally
/// named `a.b` next to field `a` holding a record with field `b`), or if one
/// key is a path prefix of another (`a.b` next to `a.b.c`).
pub fn to_flattened_mapping(record: &Record, sep: &str) -> Result<Mapping> {
    check_separator(sep)?;
    let mut out = Mapping::new();
    flatten_record(record, "", sep, &mut out)?;
    nest_mapping(&out, sep)?;
    Ok(out)
}

/// Rebuild a record of type `ty` from its flattened form.
pub fn from_flattened_mapping(ty: &Arc<RecordType>, flat: &Mapping, sep: &str) -> Result<Record> {
    let nested = nest_mapping(flat, sep)?;
    from_nested_mapping(ty, &nested)
}

/// Re-nest flattened keys into a tree of mappings.
///
/// A key that is both a leaf and a prefix of another key is a collision.
pub fn nest_mapping(flat: &Mapping, sep: &str) -> Result<Mapping> {
    check_separator(sep)?;
    let mut root: IndexMap<String, Node> = IndexMap::new();
    for (key, value) in flat {
        let parts: Vec<&str> = key.split(sep).collect();
        insert_path(&mut root, &parts, value, key)?;
    }
    Ok(into_mapping(root))
}

fn check_separator(sep: &str) -> Result<()> {
    if sep.is_empty() {
        return Err(ParamError::InvalidSeparator { sep: sep.to_string() });
    }
    Ok(())
}

fn join_key(prefix: &str, segment: &str, sep: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}{sep}{segment}")
    }
}

fn flatten_record(record: &Record, prefix: &str, sep: &str, out: &mut Mapping) -> Result<()> {
    for (name, value) in record.iter() {
        flatten_value(value, join_key(prefix, name, sep), sep, out)?;
    }
    Ok(())
}

fn flatten_value(value: &Value, key: String, sep: &str, out: &mut Mapping) -> Result<()> {
    match value {
        Value::Record(r) if r.record_type().fields().is_empty() => {
            insert_leaf(out, key, Value::Map(Mapping::new()))
        }
        Value::Record(r) => flatten_record(r, &key, sep, out),
        Value::List(items) if value.contains_record() => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(item, join_key(&key, &i.to_string(), sep), sep, out)?;
            }
            Ok(())
        }
        Value::Map(map) if value.contains_record() => {
            for (k, v) in map {
                flatten_value(v, join_key(&key, k, sep), sep, out)?;
            }
            Ok(())
        }
        leaf => insert_leaf(out, key, to_nested_value(leaf)),
    }
}

fn insert_leaf(out: &mut Mapping, key: String, value: Value) -> Result<()> {
    if out.contains_key(&key) {
        return Err(ParamError::FlattenCollision { key });
    }
    out.insert(key, value);
    Ok(())
}

enum Node {
    Leaf(Value),
    Branch(IndexMap<String, Node>),
}

fn insert_path(
    node: &mut IndexMap<String, Node>,
    parts: &[&str],
    value: &Value,
    full_key: &str,
) -> Result<()> {
    let Some((first, rest)) = parts.split_first() else {
        return Ok(());
    };
    let collision = || ParamError::FlattenCollision {
        key: full_key.to_string(),
    };

    if rest.is_empty() {
        if node.contains_key(*first) {
            return Err(collision());
        }
        node.insert(first.to_string(), Node::Leaf(value.clone()));
        return Ok(());
    }

    let child = node
        .entry(first.to_string())
        .or_insert_with(|| Node::Branch(IndexMap::new()));
    match child {
        Node::Branch(children) => insert_path(children, rest, value, full_key),
        Node::Leaf(_) => Err(collision()),
    }
}

fn into_mapping(nodes: IndexMap<String, Node>) -> Mapping {
    nodes
        .into_iter()
        .map(|(k, node)| {
            let value = match node {
                Node::Leaf(v) => v,
                Node::Branch(children) => Value::Map(into_mapping(children)),
            };
            (k, value)
        })
        .collect()
}
