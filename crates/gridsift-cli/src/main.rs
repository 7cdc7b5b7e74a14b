use anyhow::{Context, Result};
use clap::Parser;
use gridsift_cli::{load_config, Cli, Commands, GridsiftConfig};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::commands::select::SelectArgs;
use crate::commands::{explain, select, stats, validate};
mod commands;

/// `--log-level` wins, then `RUST_LOG`, then the configured level.
fn init_logging(cli: &Cli, config: &GridsiftConfig) -> Result<()> {
    let builder = FmtSubscriber::builder().with_writer(std::io::stderr);
    let installed = match (cli.log_level, EnvFilter::try_from_default_env()) {
        (Some(level), _) => {
            tracing::subscriber::set_global_default(builder.with_max_level(level).finish())
        }
        (None, Ok(filter)) => {
            tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())
        }
        (None, Err(_)) => tracing::subscriber::set_global_default(
            builder.with_max_level(config.logging.level()?).finish(),
        ),
    };
    installed.context("setting default subscriber failed")
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    init_logging(&cli, &config)?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Select {
            network,
            filter,
            store,
            kind,
            format,
        } => select::handle(
            SelectArgs {
                network: &network,
                filter: &filter,
                store: store.as_deref(),
                kind,
                format,
            },
            config.engine,
        ),
        Commands::Validate { filter } => validate::handle(&filter),
        Commands::Explain { filter } => explain::handle(&filter),
        Commands::Stats { network } => stats::handle(&network),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
