use std::path::Path;

use anyhow::{bail, Result};
use gridsift_filter::Filter;

use gridsift_cli::store::read_filter_file;

pub fn handle(path: &Path) -> Result<()> {
    let (_, filter) = read_filter_file(path)?;
    let Filter::Expert(expert) = &filter else {
        bail!("{} filters have no rule tree", filter.variant_name());
    };
    println!("{} filter on {}", filter.variant_name(), expert.equipment_type);
    if let Some(topology) = expert.topology_kind {
        println!("buses of {topology:?} voltage levels only");
    }
    print!("{}", expert.rules.explain());
    Ok(())
}
