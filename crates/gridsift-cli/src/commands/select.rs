use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use gridsift_core::EquipmentKind;
use gridsift_filter::{EngineConfig, FilterSelector, IdentifiableAttributes, InMemoryFilterStore};
use tabwriter::TabWriter;
use tracing::info;

use gridsift_cli::cli::OutputFormat;
use gridsift_cli::store::{load_network, load_store, resolve_filter};

pub struct SelectArgs<'a> {
    pub network: &'a Path,
    pub filter: &'a str,
    pub store: Option<&'a Path>,
    pub kind: Option<EquipmentKind>,
    pub format: OutputFormat,
}

pub fn handle(args: SelectArgs<'_>, engine: EngineConfig) -> Result<()> {
    let (network, _) = load_network(args.network)?;
    let store = match args.store {
        Some(dir) => load_store(dir)?,
        None => InMemoryFilterStore::new(),
    };
    let filter = resolve_filter(args.filter, &store)?;

    let selector = FilterSelector::new(&store).with_config(engine);
    let selected = match args.kind {
        Some(kind) => selector.select(&filter, &network, kind)?,
        None => selector.select_filter(&filter, &network)?,
    };
    info!(
        filter = filter.variant_name(),
        selected = selected.len(),
        "selection complete"
    );

    match args.format {
        OutputFormat::Plain => print_table(&selected),
        OutputFormat::Json => print_json(&selected),
    }
}

fn print_table(selected: &[IdentifiableAttributes]) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "ID\tKIND\tDISTRIBUTION KEY")?;
    for attributes in selected {
        let key = attributes
            .distribution_key
            .map(|key| key.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(writer, "{}\t{}\t{}", attributes.id, attributes.kind, key)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_json(selected: &[IdentifiableAttributes]) -> Result<()> {
    serde_json::to_writer_pretty(io::stdout(), selected)
        .map_err(|err| anyhow::anyhow!("serializing selection to JSON: {err}"))?;
    println!();
    Ok(())
}
