//! Command-line parsing for the `params` binary.
//!
//! Argument parsing and command dispatch stay separate from the record,
//! projection and sweep code; `app` turns these structs into a `RunConfig`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{DEFAULT_MAX_COMBINATIONS, DEFAULT_RECORD_TYPE};
use crate::io::Format;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "params",
    version,
    about = "Typed parameter trees: project, sweep and instantiate"
)]
pub struct Cli {
    /// Separator used for flattened keys.
    #[arg(long, global = true, env = "PARAMS_SEPARATOR", default_value = ".")]
    pub separator: String,

    /// Output format for printed mappings.
    #[arg(long, global = true, env = "PARAMS_FORMAT", value_enum, default_value_t = Format::Yaml)]
    pub format: Format,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the catalog's record types and targets.
    Types,
    /// Load a record and print its nested form.
    Show(RecordArgs),
    /// Load a record and print its flattened form as `key = value` lines.
    Flatten(RecordArgs),
    /// Read a flattened mapping file and print the nested form.
    Nest(NestArgs),
    /// Expand `Settings` into concrete records, print them, optionally export.
    Sweep(SweepArgs),
    /// Build the object described by a record's `type` discriminator.
    Instantiate(InstantiateArgs),
}

/// Options shared by every command that loads a record.
#[derive(Debug, Parser, Clone)]
pub struct RecordArgs {
    /// Record type from the catalog.
    #[arg(short = 't', long = "type", default_value = DEFAULT_RECORD_TYPE)]
    pub record_type: String,

    /// Nested-form config file (JSON or YAML). Catalog defaults when omitted.
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Input format, when the file extension does not tell.
    #[arg(long, value_enum)]
    pub input_format: Option<Format>,

    /// Override a field by flattened key, e.g. `--set optimizer.lr=0.1`.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub sets: Vec<String>,
}

#[derive(Debug, Parser, Clone)]
pub struct NestArgs {
    /// Flattened mapping file (JSON or YAML).
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Input format, when the file extension does not tell.
    #[arg(long, value_enum)]
    pub input_format: Option<Format>,

    /// Reconstruct as this catalog type (validates keys and fills defaults).
    #[arg(short = 't', long = "type")]
    pub record_type: Option<String>,
}

#[derive(Debug, Parser, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    /// Sweep a field over comma-separated candidates, e.g. `--grid seed=1,2,3`.
    #[arg(long = "grid", value_name = "KEY=V1,V2")]
    pub grid: Vec<String>,

    /// Refuse sweeps with more combinations than this.
    #[arg(long, env = "PARAMS_MAX_COMBINATIONS", default_value_t = DEFAULT_MAX_COMBINATIONS)]
    pub max_combinations: usize,

    /// Write one file per combination plus `manifest.json` into this directory.
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct InstantiateArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    /// Constructor override, e.g. `--arg y=2`; flattened keys reach nested
    /// targets (`--arg adder.y=2`).
    #[arg(long = "arg", value_name = "NAME=VALUE")]
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sweep_flags() {
        let cli = Cli::try_parse_from([
            "params",
            "sweep",
            "exp.yaml",
            "--grid",
            "seed=1,2",
            "--set",
            "trainer.epochs=3",
            "--separator",
            "/",
        ])
        .unwrap();
        assert_eq!(cli.separator, "/");
        match cli.command {
            Command::Sweep(args) => {
                assert_eq!(args.record.input, Some(PathBuf::from("exp.yaml")));
                assert_eq!(args.record.record_type, "Experiment");
                assert_eq!(args.grid, vec!["seed=1,2"]);
                assert_eq!(args.record.sets, vec!["trainer.epochs=3"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn instantiate_collects_args() {
        let cli =
            Cli::try_parse_from(["params", "instantiate", "-t", "PointAdder", "--arg", "y=2"])
                .unwrap();
        match cli.command {
            Command::Instantiate(args) => {
                assert_eq!(args.record.record_type, "PointAdder");
                assert_eq!(args.args, vec!["y=2"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
