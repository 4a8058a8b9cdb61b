//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - derives a `RunConfig`
//! - runs the record pipeline for the chosen subcommand
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::info;

use crate::catalog::Catalog;
use crate::cli::{Command, InstantiateArgs, NestArgs, RecordArgs, SweepArgs};
use crate::config::{parse_assignment, parse_grid, RunConfig};
use crate::error::AppError;
use crate::io::{load_mapping, render_mapping, Format};
use crate::projection::{from_nested_mapping, nest_mapping, to_flattened_mapping, to_nested_mapping};

pub mod pipeline;

/// Entry point for the `params` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();
    let catalog = Catalog::builtin();
    let base = RunConfig {
        separator: cli.separator,
        output_format: cli.format,
        ..RunConfig::default()
    };

    match cli.command {
        Command::Types => {
            print!("{}", crate::report::format_catalog(&catalog));
            Ok(())
        }
        Command::Show(args) => handle_show(&catalog, run_config_from_args(base, &args)?),
        Command::Flatten(args) => handle_flatten(&catalog, run_config_from_args(base, &args)?),
        Command::Nest(args) => handle_nest(&catalog, &args, &base),
        Command::Sweep(args) => handle_sweep(&catalog, sweep_config_from_args(base, &args)?),
        Command::Instantiate(args) => {
            handle_instantiate(&catalog, instantiate_config_from_args(base, &args)?)
        }
    }
}

fn handle_show(catalog: &Catalog, config: RunConfig) -> Result<(), AppError> {
    let record = pipeline::load_record(catalog, &config)?;
    print_mapping(&to_nested_mapping(&record), config.output_format)
}

fn handle_flatten(catalog: &Catalog, config: RunConfig) -> Result<(), AppError> {
    let record = pipeline::load_record(catalog, &config)?;
    let flat = to_flattened_mapping(&record, &config.separator)?;
    print!("{}", crate::report::format_flat(&flat));
    Ok(())
}

fn handle_nest(catalog: &Catalog, args: &NestArgs, base: &RunConfig) -> Result<(), AppError> {
    let flat = load_mapping(&args.input, args.input_format)?;
    let nested = match &args.record_type {
        Some(name) => {
            let ty = pipeline::resolve_type(catalog, name)?;
            let nested = nest_mapping(&flat, &base.separator)?;
            to_nested_mapping(&from_nested_mapping(ty, &nested)?)
        }
        None => nest_mapping(&flat, &base.separator)?,
    };
    print_mapping(&nested, base.output_format)
}

fn handle_sweep(catalog: &Catalog, config: RunConfig) -> Result<(), AppError> {
    let out = pipeline::run_sweep(catalog, &config)?;

    let sep = config.separator.as_str();
    println!(
        "{}",
        crate::report::format_sweep_summary(&out.record, &out.slots, out.combinations, sep)
    );
    print!("{}", crate::report::format_sweep_table(&out.records, &out.slots, sep));

    if let Some(dir) = &config.out_dir {
        let manifest =
            crate::io::export::write_sweep(dir, &out.records, config.output_format, sep)?;
        info!(dir = %dir.display(), runs = manifest.count, "sweep exported");
        println!(
            "\nWrote {} run file(s) and {}",
            manifest.count,
            crate::io::export::manifest_path(dir).display()
        );
    }
    Ok(())
}

fn handle_instantiate(catalog: &Catalog, config: RunConfig) -> Result<(), AppError> {
    let object = pipeline::run_instantiate(catalog, &config)?;
    println!("{object:#?}");
    Ok(())
}

fn print_mapping(mapping: &crate::domain::Mapping, format: Format) -> Result<(), AppError> {
    let text = render_mapping(mapping, format)?;
    println!("{}", text.trim_end());
    Ok(())
}

pub fn run_config_from_args(base: RunConfig, args: &RecordArgs) -> Result<RunConfig, AppError> {
    Ok(RunConfig {
        record_type: args.record_type.clone(),
        input: args.input.clone(),
        input_format: args.input_format,
        sets: args
            .sets
            .iter()
            .map(|s| parse_assignment(s))
            .collect::<Result<Vec<_>, _>>()?,
        ..base
    })
}

pub fn sweep_config_from_args(base: RunConfig, args: &SweepArgs) -> Result<RunConfig, AppError> {
    let config = run_config_from_args(base, &args.record)?;
    Ok(RunConfig {
        grid: args.grid.iter().map(|s| parse_grid(s)).collect::<Result<Vec<_>, _>>()?,
        max_combinations: args.max_combinations,
        out_dir: args.out.clone(),
        ..config
    })
}

pub fn instantiate_config_from_args(
    base: RunConfig,
    args: &InstantiateArgs,
) -> Result<RunConfig, AppError> {
    let config = run_config_from_args(base, &args.record)?;
    Ok(RunConfig {
        args: args.args.iter().map(|s| parse_assignment(s)).collect::<Result<Vec<_>, _>>()?,
        ..config
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::domain::Value;

    #[test]
    fn sweep_config_carries_grid_and_base_flags() {
        let cli = Cli::try_parse_from([
            "params",
            "--separator",
            "__",
            "sweep",
            "--grid",
            "seed=1,2",
            "--max-combinations",
            "5",
            "--out",
            "runs",
        ])
        .unwrap();
        let base = RunConfig {
            separator: cli.separator.clone(),
            ..RunConfig::default()
        };
        let Command::Sweep(args) = cli.command else {
            panic!("expected sweep");
        };
        let cfg = sweep_config_from_args(base, &args).unwrap();
        assert_eq!(cfg.separator, "__");
        assert_eq!(cfg.max_combinations, 5);
        assert_eq!(cfg.grid, vec![("seed".to_string(), vec![Value::Int(1), Value::Int(2)])]);
        assert_eq!(cfg.out_dir.as_deref(), Some(std::path::Path::new("runs")));
    }

    #[test]
    fn bad_assignment_is_rejected() {
        let args = RecordArgs {
            record_type: "Experiment".to_string(),
            input: None,
            input_format: None,
            sets: vec!["seed".to_string()],
        };
        assert_eq!(run_config_from_args(RunConfig::default(), &args).unwrap_err().exit_code(), 2);
    }
}
