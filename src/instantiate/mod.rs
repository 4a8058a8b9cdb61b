//! Discriminator-driven instantiation.
//!
//! A record type declared with a discriminator field names a target. To
//! instantiate a record:
//!
//! - resolve the target named by the discriminator value
//! - instantiate every field that holds an instantiable record, depth first
//! - drop null fields the caller did not override
//! - merge caller overrides (nested overrides reach nested records)
//! - call the target with the result as keyword arguments
//!
//! Records still holding `Settings` are rejected; expand them first.

pub mod target;

pub use target::*;

use indexmap::IndexMap;
use tracing::debug;

use crate::domain::{join_path, Mapping, Record, Value};
use crate::error::{ParamError, Result};

/// A caller-supplied argument replacing or adding to a record field.
#[derive(Debug, Clone)]
pub enum Override {
    Value(Value),
    Object(Object),
    /// Overrides applied inside the nested instantiable record of that field.
    Nested(Overrides),
}

#[derive(Debug, Clone, Default)]
pub struct Overrides {
    entries: IndexMap<String, Override>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.entries.insert(name.to_string(), Override::Value(value.into()));
        self
    }

    pub fn object(mut self, name: &str, object: Object) -> Self {
        self.entries.insert(name.to_string(), Override::Object(object));
        self
    }

    pub fn nested(mut self, name: &str, overrides: Overrides) -> Self {
        self.entries.insert(name.to_string(), Override::Nested(overrides));
        self
    }

    /// Plain value overrides, e.g. parsed from `--set y=2`.
    pub fn from_mapping(mapping: &Mapping) -> Self {
        let entries = mapping
            .iter()
            .map(|(k, v)| (k.clone(), Override::Value(v.clone())))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the object described by `record`.
pub fn instantiate(
    record: &Record,
    registry: &TargetRegistry,
    overrides: &Overrides,
) -> Result<Object> {
    if record.contains_settings() {
        return Err(ParamError::validation(
            display_path(""),
            "a concrete record",
            "a record holding settings (expand it first)",
        ));
    }
    instantiate_at(record, registry, overrides.clone(), "")
}

impl Record {
    pub fn instantiate(&self, registry: &TargetRegistry, overrides: &Overrides) -> Result<Object> {
        instantiate(self, registry, overrides)
    }
}

fn instantiate_at(
    record: &Record,
    registry: &TargetRegistry,
    overrides: Overrides,
    path: &str,
) -> Result<Object> {
    let Some(discriminator) = record.record_type().discriminator() else {
        return Err(ParamError::field(
            display_path(path),
            format!(
                "record type '{}' has no discriminator and cannot be instantiated",
                record.type_name()
            ),
        ));
    };
    let disc_path = join_path(path, discriminator);
    let name = record
        .get(discriminator)
        .and_then(Value::as_str)
        .ok_or_else(|| ParamError::field(&disc_path, "discriminator must be a string"))?;
    let descriptor = registry.resolve(name).ok_or_else(|| ParamError::Resolution {
        name: name.to_string(),
        path: disc_path.clone(),
    })?;

    let mut remaining = overrides.entries;
    let mut kwargs = Kwargs::default();

    for (field, value) in record.iter() {
        if field == discriminator {
            continue;
        }
        let field_path = join_path(path, field);
        match value {
            Value::Record(child) if child.record_type().is_instantiable() => {
                let nested = match remaining.shift_remove(field) {
                    None => Overrides::default(),
                    Some(Override::Nested(o)) => o,
                    Some(Override::Value(Value::Map(m))) => Overrides::from_mapping(&m),
                    Some(replacement) => {
                        kwargs.insert(field, into_arg(replacement, &field_path)?);
                        continue;
                    }
                };
                let object = instantiate_at(child, registry, nested, &field_path)?;
                kwargs.insert(field, Arg::Object(object));
            }
            _ if remaining.contains_key(field) => {}
            Value::Null => {}
            other => kwargs.insert(field, Arg::Value(other.clone())),
        }
    }

    for (field, ov) in remaining {
        let field_path = join_path(path, &field);
        kwargs.insert(field, into_arg(ov, &field_path)?);
    }

    debug!(
        name = %descriptor.name,
        path = %display_path(path),
        args = kwargs.len(),
        "instantiating"
    );
    descriptor.invoke(&kwargs, &display_path(path))
}

fn into_arg(ov: Override, path: &str) -> Result<Arg> {
    match ov {
        Override::Value(v) => Ok(Arg::Value(v)),
        Override::Object(o) => Ok(Arg::Object(o)),
        Override::Nested(_) => Err(ParamError::field(
            path,
            "nested overrides only apply to instantiable record fields",
        )),
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Mlp, Point, Pipeline};
    use crate::domain::Settings;

    fn catalog() -> Catalog {
        Catalog::builtin()
    }

    #[test]
    fn override_supplies_missing_required_argument() {
        let catalog = catalog();
        let adder = catalog.record_type("PointAdder").unwrap().instance().unwrap();
        assert_eq!(adder["type"], Value::from("PointAdder"));

        let obj = adder
            .instantiate(catalog.targets(), &Overrides::new().value("y", 2))
            .unwrap();
        assert_eq!(obj.downcast_ref::<Point>(), Some(&Point { x: 1, y: 2 }));
    }

    #[test]
    fn missing_required_argument_is_named() {
        let catalog = catalog();
        let adder = catalog.record_type("PointAdder").unwrap().instance().unwrap();
        let err = instantiate(&adder, catalog.targets(), &Overrides::new()).unwrap_err();
        match err {
            ParamError::MissingArgument { target, param, path } => {
                assert_eq!(target, "PointAdder");
                assert_eq!(param, "y");
                assert_eq!(path, "<root>");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn null_fields_are_omitted_unless_overridden() {
        let catalog = catalog();
        let mlp = catalog.record_type("Mlp").unwrap().instance().unwrap();
        assert!(mlp["dropout"].is_null());

        let obj = instantiate(&mlp, catalog.targets(), &Overrides::new()).unwrap();
        assert_eq!(obj.downcast_ref::<Mlp>().unwrap().dropout, None);

        let overrides = Overrides::new().value("dropout", 0.25);
        let obj = instantiate(&mlp, catalog.targets(), &overrides).unwrap();
        assert_eq!(obj.downcast_ref::<Mlp>().unwrap().dropout, Some(0.25));
    }

    #[test]
    fn nested_records_are_instantiated_first() {
        let catalog = catalog();
        let mut pipeline = catalog.record_type("Pipeline").unwrap().instance().unwrap();
        pipeline["model"].as_record_mut().unwrap()["hidden"] = Value::from(vec![8, 4]);

        let overrides = Overrides::new()
            .nested("adder", Overrides::new().value("y", 5))
            .value("name", "demo");
        let obj = instantiate(&pipeline, catalog.targets(), &overrides).unwrap();
        let built = obj.downcast_ref::<Pipeline>().unwrap();
        assert_eq!(built.name, "demo");
        assert_eq!(built.model.hidden, vec![8, 4]);
        assert_eq!(*built.adder, Point { x: 1, y: 5 });
    }

    #[test]
    fn map_override_on_instantiable_field_acts_as_nested() {
        let catalog = catalog();
        let pipeline = catalog.record_type("Pipeline").unwrap().instance().unwrap();
        let mut inner = Mapping::new();
        inner.insert("y".into(), Value::Int(7));
        let overrides = Overrides::new().value("adder", Value::Map(inner));

        let obj = instantiate(&pipeline, catalog.targets(), &overrides).unwrap();
        assert_eq!(obj.downcast_ref::<Pipeline>().unwrap().adder.y, 7);
    }

    #[test]
    fn nested_missing_argument_reports_nested_path() {
        let catalog = catalog();
        let pipeline = catalog.record_type("Pipeline").unwrap().instance().unwrap();
        let err = instantiate(&pipeline, catalog.targets(), &Overrides::new()).unwrap_err();
        assert!(matches!(
            err,
            ParamError::MissingArgument { ref path, ref param, .. }
                if path == "adder" && param == "y"
        ));
    }

    #[test]
    fn unknown_target_is_a_resolution_error() {
        let catalog = catalog();
        let mut adder = catalog.record_type("PointAdder").unwrap().instance().unwrap();
        adder["type"] = Value::from("NoSuchThing");
        let overrides = Overrides::new().value("y", 1);
        let err = instantiate(&adder, catalog.targets(), &overrides).unwrap_err();
        assert!(matches!(err, ParamError::Resolution { ref name, .. } if name == "NoSuchThing"));
    }

    #[test]
    fn records_with_settings_are_rejected() {
        let catalog = catalog();
        let mut adder = catalog.record_type("PointAdder").unwrap().instance().unwrap();
        adder["x"] = Value::Settings(Settings::new([1, 2]));
        let overrides = Overrides::new().value("y", 1);
        let err = instantiate(&adder, catalog.targets(), &overrides).unwrap_err();
        assert!(matches!(err, ParamError::Validation { .. }));
    }

    #[test]
    fn plain_records_are_not_instantiable() {
        let catalog = catalog();
        let trainer = catalog.record_type("Trainer").unwrap().instance().unwrap();
        let err = instantiate(&trainer, catalog.targets(), &Overrides::new()).unwrap_err();
        assert!(matches!(err, ParamError::Field { .. }));
    }
}
