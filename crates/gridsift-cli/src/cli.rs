use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use gridsift_core::EquipmentKind;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gridsift", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level (RUST_LOG is used when this is absent)
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    /// Configuration file (defaults to ./gridsift.toml when present)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Select the equipment of a network matched by a filter
    Select {
        /// Network document (JSON)
        #[arg(long, value_hint = ValueHint::FilePath)]
        network: PathBuf,
        /// Filter definition file, or the id of a filter in the store
        #[arg(long)]
        filter: String,
        /// Directory of stored filters, one JSON file per filter
        #[arg(long, value_hint = ValueHint::DirPath)]
        store: Option<PathBuf>,
        /// Equipment kind to select (defaults to the kind the filter declares)
        #[arg(long)]
        kind: Option<EquipmentKind>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// Parse a filter definition and check its rule tree
    Validate {
        /// Filter definition file
        #[arg(long, value_hint = ValueHint::FilePath)]
        filter: PathBuf,
    },
    /// Print the rule tree of an expert filter
    Explain {
        /// Filter definition file
        #[arg(long, value_hint = ValueHint::FilePath)]
        filter: PathBuf,
    },
    /// Equipment counts and load diagnostics of a network document
    Stats {
        /// Network document (JSON)
        #[arg(long, value_hint = ValueHint::FilePath)]
        network: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}
