use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use tabwriter::TabWriter;

use gridsift_cli::store::load_network;

pub fn handle(path: &Path) -> Result<()> {
    let (network, diagnostics) = load_network(path)?;
    let stats = network.stats();

    println!("Network statistics for {}:", path.display());
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "KIND\tCOUNT")?;
    for (kind, count) in &stats.counts {
        writeln!(writer, "{kind}\t{count}")?;
    }
    writeln!(writer, "TOTAL\t{}", stats.total())?;
    writer.flush()?;

    print!("{diagnostics}");
    Ok(())
}
