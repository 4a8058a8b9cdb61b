//! Record schemas.
//!
//! A record type is an explicit, ordered list of `(name, type, default)` entries
//! built once through [`RecordType::builder`] and shared as `Arc<RecordType>`.
//! Every instance is created from that schema:
//!
//! - value defaults are cloned per instance (a clone is a deep copy)
//! - factory defaults are invoked per instance
//! - required fields must be supplied by the caller
//!
//! Capabilities are declared on the type rather than inherited from mixins:
//! a disambiguator registry for union fields, and an optional discriminator
//! field that makes the type instantiable.

use std::fmt;
use std::sync::Arc;

use crate::disambiguate::{DisambiguatorRegistry, Resolver};
use crate::domain::{Mapping, Record, Value};
use crate::error::{ParamError, Result};

/// Declared type of a record field.
#[derive(Clone)]
pub enum FieldType {
    Any,
    Bool,
    Int,
    Float,
    Str,
    List(Box<FieldType>),
    Map(Box<FieldType>),
    Record(Arc<RecordType>),
    Union(Vec<FieldType>),
    Optional(Box<FieldType>),
}

impl FieldType {
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    pub fn map(inner: FieldType) -> Self {
        FieldType::Map(Box::new(inner))
    }

    pub fn record(ty: &Arc<RecordType>) -> Self {
        FieldType::Record(Arc::clone(ty))
    }

    pub fn union(candidates: impl IntoIterator<Item = FieldType>) -> Self {
        FieldType::Union(candidates.into_iter().collect())
    }

    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    /// Strict instance check: no numeric widening, records match by exact type.
    ///
    /// A subtype instance is not accepted where its base is declared, since
    /// reconstruction rebuilds the declared type; list the subtype in a
    /// `Union` instead.
    pub fn is_instance(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Any, _) => true,
            (FieldType::Bool, Value::Bool(_))
            | (FieldType::Int, Value::Int(_))
            | (FieldType::Float, Value::Float(_))
            | (FieldType::Str, Value::Str(_)) => true,
            (FieldType::List(inner), Value::List(items)) => {
                items.iter().all(|v| inner.is_instance(v))
            }
            (FieldType::Map(inner), Value::Map(map)) => map.values().all(|v| inner.is_instance(v)),
            (FieldType::Record(ty), Value::Record(r)) => r.record_type().same_type(ty),
            (FieldType::Union(candidates), v) => candidates.iter().any(|c| c.is_instance(v)),
            (FieldType::Optional(_), Value::Null) => true,
            (FieldType::Optional(inner), v) => inner.is_instance(v),
            _ => false,
        }
    }

    /// Validate `value` against this type, widening ints to floats.
    ///
    /// `Settings` are accepted when every candidate is.
    pub fn coerce(&self, value: Value, path: &str) -> Result<Value> {
        if let Value::Settings(settings) = value {
            let candidates = settings
                .into_inner()
                .into_iter()
                .map(|v| self.coerce(v, path))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Value::Settings(candidates.into_iter().collect()));
        }

        match (self, value) {
            (FieldType::Any, v) => Ok(v),
            (FieldType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (FieldType::Optional(_), Value::Null) => Ok(Value::Null),
            (FieldType::Optional(inner), v) => inner.coerce(v, path),
            (FieldType::List(inner), Value::List(items)) => Ok(Value::List(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| inner.coerce(v, &format!("{path}.{i}")))
                    .collect::<Result<_>>()?,
            )),
            (FieldType::Map(inner), Value::Map(map)) => Ok(Value::Map(
                map.into_iter()
                    .map(|(k, v)| -> Result<(String, Value)> {
                        let v = inner.coerce(v, &format!("{path}.{k}"))?;
                        Ok((k, v))
                    })
                    .collect::<Result<Mapping>>()?,
            )),
            (FieldType::Union(candidates), v) => {
                if candidates.iter().any(|c| c.is_instance(&v)) {
                    return Ok(v);
                }
                for candidate in candidates {
                    if let Ok(coerced) = candidate.coerce(v.clone(), path) {
                        return Ok(coerced);
                    }
                }
                Err(ParamError::validation(path, self.to_string(), v.describe()))
            }
            (ty, v) if ty.is_instance(&v) => Ok(v),
            (ty, v) => Err(ParamError::validation(path, ty.to_string(), v.describe())),
        }
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldType::Any, FieldType::Any)
            | (FieldType::Bool, FieldType::Bool)
            | (FieldType::Int, FieldType::Int)
            | (FieldType::Float, FieldType::Float)
            | (FieldType::Str, FieldType::Str) => true,
            (FieldType::List(a), FieldType::List(b))
            | (FieldType::Map(a), FieldType::Map(b))
            | (FieldType::Optional(a), FieldType::Optional(b)) => a == b,
            (FieldType::Record(a), FieldType::Record(b)) => a.same_type(b),
            (FieldType::Union(a), FieldType::Union(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Any => write!(f, "Any"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::Int => write!(f, "int"),
            FieldType::Float => write!(f, "float"),
            FieldType::Str => write!(f, "str"),
            FieldType::List(inner) => write!(f, "List[{inner}]"),
            FieldType::Map(inner) => write!(f, "Map[{inner}]"),
            FieldType::Record(ty) => write!(f, "{}", ty.name()),
            FieldType::Union(candidates) => {
                let parts: Vec<String> = candidates.iter().map(ToString::to_string).collect();
                write!(f, "Union[{}]", parts.join(", "))
            }
            FieldType::Optional(inner) => write!(f, "Optional[{inner}]"),
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

pub type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// How a field obtains its value when the caller does not provide one.
#[derive(Clone)]
pub enum FieldDefault {
    Required,
    Value(Value),
    Factory(DefaultFactory),
}

impl FieldDefault {
    /// A fresh default value, or `None` for required fields.
    pub fn produce(&self) -> Option<Value> {
        match self {
            FieldDefault::Required => None,
            FieldDefault::Value(v) => Some(v.clone()),
            FieldDefault::Factory(factory) => Some(factory()),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, FieldDefault::Required)
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Required => write!(f, "Required"),
            FieldDefault::Value(v) => write!(f, "Value({v})"),
            FieldDefault::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// Wrap a value that must not be shared between instances (a record, a list,
/// a map) into a factory that hands out an independent copy on every call.
pub fn default_value(value: impl Into<Value>) -> FieldDefault {
    let value = value.into();
    FieldDefault::Factory(Arc::new(move || value.clone()))
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    ty: FieldType,
    default: FieldDefault,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, ty: FieldType, default: FieldDefault) -> Self {
        Self {
            name: name.into(),
            ty,
            default,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn default(&self) -> &FieldDefault {
        &self.default
    }
}

pub struct RecordType {
    name: String,
    fields: Vec<FieldSpec>,
    parent: Option<Arc<RecordType>>,
    disambiguators: DisambiguatorRegistry,
    discriminator: Option<String>,
}

impl RecordType {
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: name.into(),
            fields: Vec::new(),
            parent: None,
            disambiguators: DisambiguatorRegistry::default(),
            discriminator: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order (inherited fields first).
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn parent(&self) -> Option<&Arc<RecordType>> {
        self.parent.as_ref()
    }

    /// This type followed by its ancestors, nearest first.
    pub fn lineage(&self) -> impl Iterator<Item = &RecordType> {
        std::iter::successors(Some(self), |ty| ty.parent.as_deref())
    }

    /// Record types are identified by name.
    pub fn same_type(&self, other: &RecordType) -> bool {
        self.name == other.name
    }

    pub fn disambiguators(&self) -> &DisambiguatorRegistry {
        &self.disambiguators
    }

    /// Name of the field holding the constructible target, if instantiable.
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    pub fn is_instantiable(&self) -> bool {
        self.discriminator.is_some()
    }

    /// An instance populated entirely from defaults.
    pub fn instance(self: &Arc<Self>) -> Result<Record> {
        self.construct(Mapping::new())
    }

    /// Constructor: named arguments over defaults, with validation.
    pub fn construct(self: &Arc<Self>, args: Mapping) -> Result<Record> {
        self.construct_at(args, "")
    }

    pub(crate) fn construct_at(
        self: &Arc<Self>,
        mut args: Mapping,
        prefix: &str,
    ) -> Result<Record> {
        if let Some(unknown) = args.keys().find(|k| self.field(k).is_none()) {
            return Err(ParamError::field(
                join_path(prefix, unknown),
                format!("{} has no field named '{unknown}'", self.name),
            ));
        }

        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let path = join_path(prefix, &field.name);
            let raw = match args.shift_remove(&field.name) {
                Some(v) => v,
                None => field.default.produce().ok_or_else(|| {
                    ParamError::field(&path, format!("required field of {} is missing", self.name))
                })?,
            };
            values.push(field.ty.coerce(raw, &path)?);
        }
        Ok(Record::from_parts(Arc::clone(self), values))
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("discriminator", &self.discriminator)
            .finish()
    }
}

pub(crate) fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

pub struct RecordTypeBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    parent: Option<Arc<RecordType>>,
    disambiguators: DisambiguatorRegistry,
    discriminator: Option<String>,
}

impl RecordTypeBuilder {
    /// Inherit `parent`'s fields (placed first) and registry lookups.
    pub fn extends(mut self, parent: &Arc<RecordType>) -> Self {
        let own = std::mem::replace(&mut self.fields, parent.fields.clone());
        for field in own {
            self.push(field);
        }
        if self.discriminator.is_none() {
            self.discriminator = parent.discriminator.clone();
        }
        self.parent = Some(Arc::clone(parent));
        self
    }

    pub fn field(self, name: &str, ty: FieldType, default: impl Into<Value>) -> Self {
        self.with_default(name, ty, FieldDefault::Value(default.into()))
    }

    pub fn required(self, name: &str, ty: FieldType) -> Self {
        self.with_default(name, ty, FieldDefault::Required)
    }

    /// `Optional[ty]` field defaulting to null.
    pub fn optional(self, name: &str, ty: FieldType) -> Self {
        self.with_default(name, FieldType::optional(ty), FieldDefault::Value(Value::Null))
    }

    pub fn factory(
        self,
        name: &str,
        ty: FieldType,
        factory: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.with_default(name, ty, FieldDefault::Factory(Arc::new(factory)))
    }

    /// Field whose default is a nested record built from `ty`'s own defaults.
    ///
    /// If `ty` has required fields the nested field is required too.
    pub fn record(self, name: &str, ty: &Arc<RecordType>) -> Self {
        let default = match ty.instance() {
            Ok(instance) => default_value(instance),
            Err(_) => FieldDefault::Required,
        };
        self.with_default(name, FieldType::record(ty), default)
    }

    pub fn with_default(mut self, name: &str, ty: FieldType, default: FieldDefault) -> Self {
        self.push(FieldSpec::new(name, ty, default));
        self
    }

    /// Register how to narrow a union of `candidates` from raw input.
    pub fn disambiguator(
        mut self,
        candidates: Vec<FieldType>,
        resolver: impl Fn(&Value, &[FieldType]) -> Option<FieldType> + Send + Sync + 'static,
    ) -> Self {
        let resolver: Resolver = Arc::new(resolver);
        self.disambiguators.register(candidates, resolver);
        self
    }

    /// Make the type instantiable: `field` (usually `"type"`) names the target
    /// and defaults to `target`.
    pub fn discriminator(mut self, field: &str, target: &str) -> Self {
        self.discriminator = Some(field.to_string());
        self.push(FieldSpec::new(
            field,
            FieldType::Str,
            FieldDefault::Value(Value::from(target)),
        ));
        self
    }

    pub fn build(self) -> Arc<RecordType> {
        Arc::new(RecordType {
            name: self.name,
            fields: self.fields,
            parent: self.parent,
            disambiguators: self.disambiguators,
            discriminator: self.discriminator,
        })
    }

    fn push(&mut self, field: FieldSpec) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }
}
