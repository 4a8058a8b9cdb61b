//! Shared record pipeline used by every subcommand.
//!
//! load (file or catalog defaults) -> `--set` overrides -> `--grid` axes ->
//! project / expand / instantiate
//!
//! Overrides and grid axes are applied on the flattened form, so they address
//! fields by the same keys `params flatten` prints.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::RunConfig;
use crate::domain::{Mapping, Record, RecordType, Settings, Value};
use crate::error::AppError;
use crate::instantiate::{Object, Overrides};
use crate::projection::{from_flattened_mapping, nest_mapping, to_flattened_mapping};
use crate::sweep::{collect_slots, count_combinations, get_settings_limited, SettingsSlot};

/// Everything `params sweep` prints or exports.
#[derive(Debug, Clone)]
pub struct SweepOutput {
    pub record: Record,
    pub slots: Vec<SettingsSlot>,
    pub combinations: usize,
    pub records: Vec<Record>,
}

pub fn resolve_type<'a>(catalog: &'a Catalog, name: &str) -> Result<&'a Arc<RecordType>, AppError> {
    catalog.record_type(name).ok_or_else(|| {
        let known: Vec<&str> = catalog.types().map(|t| t.name()).collect();
        AppError::new(2, format!("Unknown record type '{name}' (known: {}).", known.join(", ")))
    })
}

/// Load the configured record and apply `--set` and `--grid`.
pub fn load_record(catalog: &Catalog, config: &RunConfig) -> Result<Record, AppError> {
    let ty = resolve_type(catalog, &config.record_type)?;
    let base = match &config.input {
        Some(path) => crate::io::load_record(path, ty, config.input_format)?,
        None => ty.instance()?,
    };
    if config.sets.is_empty() && config.grid.is_empty() {
        return Ok(base);
    }

    let sep = config.separator.as_str();
    let mut flat = to_flattened_mapping(&base, sep)?;
    for (key, value) in &config.sets {
        flat.insert(key.clone(), value.clone());
    }
    for (key, candidates) in &config.grid {
        let settings = Settings::new(candidates.iter().cloned());
        flat.insert(key.clone(), crate::projection::to_nested_value(&Value::Settings(settings)));
    }
    Ok(from_flattened_mapping(ty, &flat, sep)?)
}

pub fn run_sweep(catalog: &Catalog, config: &RunConfig) -> Result<SweepOutput, AppError> {
    let record = load_record(catalog, config)?;
    let slots = collect_slots(&record)?;
    let combinations = count_combinations(&record)?;
    let records = get_settings_limited(&record, config.max_combinations)?;

    Ok(SweepOutput {
        record,
        slots,
        combinations,
        records,
    })
}

/// Turn `--arg` assignments into overrides; flattened keys become nested
/// overrides for nested targets.
pub fn overrides_from_args(args: &[(String, Value)], sep: &str) -> Result<Overrides, AppError> {
    let flat: Mapping = args.iter().cloned().collect();
    let nested = nest_mapping(&flat, sep)?;
    Ok(Overrides::from_mapping(&nested))
}

pub fn run_instantiate(catalog: &Catalog, config: &RunConfig) -> Result<Object, AppError> {
    let record = load_record(catalog, config)?;
    let overrides = overrides_from_args(&config.args, &config.separator)?;
    Ok(record.instantiate(catalog.targets(), &overrides)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Pipeline, Point};

    fn config(record_type: &str) -> RunConfig {
        RunConfig {
            record_type: record_type.to_string(),
            ..RunConfig::default()
        }
    }

    #[test]
    fn sets_and_grid_apply_by_flattened_key() {
        let catalog = Catalog::builtin();
        let mut cfg = config("Experiment");
        cfg.sets = vec![("trainer.epochs".to_string(), Value::Int(3))];
        cfg.grid = vec![("seed".to_string(), vec![Value::Int(1), Value::Int(2)])];

        let out = run_sweep(&catalog, &cfg).unwrap();
        assert_eq!(out.combinations, 2);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[1]["seed"], Value::Int(2));
        assert_eq!(out.records[0].get_path(&["trainer", "epochs"]), Some(&Value::Int(3)));
    }

    #[test]
    fn sweep_limit_maps_to_input_error() {
        let catalog = Catalog::builtin();
        let mut cfg = config("Experiment");
        cfg.grid = vec![("seed".to_string(), (0..20).map(Value::from).collect())];
        cfg.max_combinations = 10;
        assert_eq!(run_sweep(&catalog, &cfg).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn unknown_type_is_a_usage_error() {
        let catalog = Catalog::builtin();
        let err = load_record(&catalog, &config("Nope")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("Experiment"));
    }

    #[test]
    fn instantiate_with_nested_args() {
        let catalog = Catalog::builtin();
        let mut cfg = config("Pipeline");
        cfg.args = vec![
            ("adder.y".to_string(), Value::Int(4)),
            ("name".to_string(), Value::from("cli")),
        ];
        let obj = run_instantiate(&catalog, &cfg).unwrap();
        let built = obj.downcast_ref::<Pipeline>().unwrap();
        assert_eq!(built.name, "cli");
        assert_eq!(*built.adder, Point { x: 1, y: 4 });
    }

    #[test]
    fn missing_constructor_argument_exits_with_3() {
        let catalog = Catalog::builtin();
        let err = run_instantiate(&catalog, &config("PointAdder")).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("'y'"));
    }
}
