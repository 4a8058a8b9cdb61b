//! Built-in record types and targets.
//!
//! A small optimizer/model/trainer schema used by the `params` binary and the
//! test suite:
//!
//! - `Adam`, `Sgd`: optimizer records; `Experiment.optimizer` is a union of the
//!   two, narrowed from raw input by the presence of `momentum`
//! - `Mlp`, `PointAdder`, `Pipeline`: instantiable records with matching
//!   targets
//! - `Trainer`: plain nested record
//! - `Experiment`: the root schema tying them together

use std::sync::Arc;

use indexmap::IndexMap;

use crate::disambiguate::by_field;
use crate::domain::{default_value, FieldDefault, FieldType, Mapping, RecordType, Value};
use crate::instantiate::{Object, ParamSpec, TargetDescriptor, TargetRegistry};

/// Record types by name, plus the targets their discriminators refer to.
#[derive(Debug, Clone)]
pub struct Catalog {
    types: IndexMap<String, Arc<RecordType>>,
    targets: TargetRegistry,
}

/// Built by the `Mlp` target.
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    pub hidden: Vec<i64>,
    pub activation: String,
    pub dropout: Option<f64>,
}

/// Built by the `PointAdder` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// Built by the `Pipeline` target from its nested objects.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub model: Arc<Mlp>,
    pub adder: Arc<Point>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self {
            types: IndexMap::new(),
            targets: TargetRegistry::default(),
        }
    }

    pub fn builtin() -> Self {
        let mut catalog = Self::empty();

        let adam = RecordType::builder("Adam")
            .field("lr", FieldType::Float, 0.001)
            .with_default(
                "betas",
                FieldType::list(FieldType::Float),
                default_value(vec![0.9, 0.999]),
            )
            .field("amsgrad", FieldType::Bool, false)
            .build();
        let sgd = RecordType::builder("Sgd")
            .field("lr", FieldType::Float, 0.01)
            .field("momentum", FieldType::Float, 0.9)
            .build();
        let mlp = RecordType::builder("Mlp")
            .discriminator("type", "Mlp")
            .with_default("hidden", FieldType::list(FieldType::Int), default_value(vec![64, 64]))
            .field("activation", FieldType::Str, "relu")
            .optional("dropout", FieldType::Float)
            .build();
        let trainer = RecordType::builder("Trainer")
            .field("epochs", FieldType::Int, 10)
            .field("batch_size", FieldType::Int, 32)
            .build();
        let point_adder = RecordType::builder("PointAdder")
            .discriminator("type", "PointAdder")
            .field("x", FieldType::Int, 1)
            .build();
        let pipeline = RecordType::builder("Pipeline")
            .discriminator("type", "Pipeline")
            .field("name", FieldType::Str, "pipeline")
            .record("model", &mlp)
            .record("adder", &point_adder)
            .build();

        let optimizer = [FieldType::record(&adam), FieldType::record(&sgd)];
        let experiment = RecordType::builder("Experiment")
            .field("name", FieldType::Str, "baseline")
            .field("seed", FieldType::Int, 0)
            .with_default("optimizer", FieldType::union(optimizer.clone()), record_default(&adam))
            .record("model", &mlp)
            .record("trainer", &trainer)
            .with_default(
                "tags",
                FieldType::map(FieldType::Str),
                default_value(Value::Map(Mapping::new())),
            )
            .disambiguator(optimizer.to_vec(), by_field("momentum", &sgd, &adam))
            .build();

        for ty in [adam, sgd, mlp, trainer, point_adder, pipeline, experiment] {
            catalog.add_type(ty);
        }

        catalog
            .targets
            .register(
                TargetDescriptor::new(
                    "Mlp",
                    vec![
                        ParamSpec::required("hidden"),
                        ParamSpec::optional("activation"),
                        ParamSpec::optional("dropout"),
                    ],
                    |kw| {
                        let hidden = kw
                            .value("hidden")?
                            .as_list()
                            .ok_or("argument 'hidden' must be a list")?
                            .iter()
                            .map(|v| {
                                v.as_i64()
                                    .ok_or_else(|| format!("hidden size {v} is not an integer"))
                            })
                            .collect::<Result<Vec<_>, String>>()?;
                        if hidden.iter().any(|&h| h <= 0) {
                            return Err("hidden sizes must be positive".to_string());
                        }
                        let activation = if kw.contains("activation") {
                            kw.str("activation")?.to_string()
                        } else {
                            "relu".to_string()
                        };
                        let dropout = kw.opt_f64("dropout")?;
                        if let Some(p) = dropout
                            && !(0.0..1.0).contains(&p)
                        {
                            return Err(format!("dropout must be in [0, 1), got {p}"));
                        }
                        Ok(Object::new(Mlp {
                            hidden,
                            activation,
                            dropout,
                        }))
                    },
                )
                .with_doc("multi-layer perceptron description"),
            )
            .register(
                TargetDescriptor::new(
                    "PointAdder",
                    vec![ParamSpec::required("x"), ParamSpec::required("y")],
                    |kw| {
                        Ok(Object::new(Point {
                            x: kw.i64("x")?,
                            y: kw.i64("y")?,
                        }))
                    },
                )
                .with_doc("integer point from x and y"),
            )
            .register(
                TargetDescriptor::new(
                    "Pipeline",
                    vec![
                        ParamSpec::optional("name"),
                        ParamSpec::required("model"),
                        ParamSpec::required("adder"),
                    ],
                    |kw| {
                        let name = if kw.contains("name") {
                            kw.str("name")?.to_string()
                        } else {
                            "pipeline".to_string()
                        };
                        Ok(Object::new(Pipeline {
                            name,
                            model: kw.object::<Mlp>("model")?,
                            adder: kw.object::<Point>("adder")?,
                        }))
                    },
                )
                .with_doc("model plus point adder"),
            );

        catalog
    }

    pub fn add_type(&mut self, ty: Arc<RecordType>) {
        self.types.insert(ty.name().to_string(), ty);
    }

    pub fn record_type(&self, name: &str) -> Option<&Arc<RecordType>> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &Arc<RecordType>> {
        self.types.values()
    }

    pub fn targets(&self) -> &TargetRegistry {
        &self.targets
    }

    pub fn targets_mut(&mut self) -> &mut TargetRegistry {
        &mut self.targets
    }
}

fn record_default(ty: &Arc<RecordType>) -> FieldDefault {
    match ty.instance() {
        Ok(instance) => default_value(instance),
        Err(_) => FieldDefault::Required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_instantiable_type_has_a_target() {
        let catalog = Catalog::builtin();
        for ty in catalog.types().filter(|t| t.is_instantiable()) {
            let record = ty.instance().unwrap();
            let name = record["type"].as_str().unwrap();
            assert!(catalog.targets().is_known(name), "{name}");
        }
    }

    #[test]
    fn defaults_are_not_shared_between_instances() {
        let catalog = Catalog::builtin();
        let ty = catalog.record_type("Experiment").unwrap();
        let mut a = ty.instance().unwrap();
        let b = ty.instance().unwrap();
        a["model"].as_record_mut().unwrap()["hidden"] = Value::from(vec![1]);
        a["optimizer"].as_record_mut().unwrap()["lr"] = Value::Float(0.5);
        assert_eq!(b.get_path(&["model", "hidden"]), Some(&Value::from(vec![64, 64])));
        assert_eq!(b.get_path(&["optimizer", "lr"]), Some(&Value::Float(0.001)));
    }

    #[test]
    fn mlp_target_validates_dropout() {
        let catalog = Catalog::builtin();
        let mut mlp = catalog.record_type("Mlp").unwrap().instance().unwrap();
        mlp["dropout"] = Value::Float(1.5);
        let err = mlp
            .instantiate(catalog.targets(), &crate::instantiate::Overrides::new())
            .unwrap_err();
        assert!(err.to_string().contains("dropout"));
    }
}
