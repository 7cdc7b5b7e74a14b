//! Filter definitions on disk.
//!
//! A store directory holds one JSON file per filter, each of the form
//! `{ "id": "<uuid>", "filter": { ... } }`. A standalone filter file may use
//! that form or hold the bare filter object.

use anyhow::{bail, Context, Result};
use gridsift_core::{Diagnostics, Network, NetworkDocument};
use gridsift_filter::{Filter, FilterId, InMemoryFilterStore, StoredFilter};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Deserialize)]
#[serde(untagged)]
enum FilterFile {
    Stored(StoredFilter),
    Bare(Filter),
}

/// Read one filter file, returning its id when the file carries one.
pub fn read_filter_file(path: &Path) -> Result<(Option<FilterId>, Filter)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading filter {}", path.display()))?;
    let parsed: FilterFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing filter {}", path.display()))?;
    Ok(match parsed {
        FilterFile::Stored(stored) => (Some(stored.id), stored.filter),
        FilterFile::Bare(filter) => (None, filter),
    })
}

/// Load every `*.json` file of a directory into a store.
pub fn load_store(dir: &Path) -> Result<InMemoryFilterStore> {
    if !dir.is_dir() {
        bail!("filter store {} is not a directory", dir.display());
    }
    let mut store = InMemoryFilterStore::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading filter {}", path.display()))?;
        let stored: StoredFilter = serde_json::from_str(&text)
            .with_context(|| format!("parsing stored filter {}", path.display()))?;
        if store.insert(stored.id, stored.filter).is_some() {
            warn!(filter = %stored.id, file = %path.display(), "duplicate filter id, keeping the later file");
        }
    }
    debug!(store = %dir.display(), filters = store.len(), "filter store loaded");
    Ok(store)
}

/// Resolve the `--filter` argument: a stored filter id or a filter file.
pub fn resolve_filter(arg: &str, store: &InMemoryFilterStore) -> Result<Filter> {
    if let Ok(id) = arg.parse::<FilterId>() {
        return store
            .get(&id)
            .cloned()
            .with_context(|| format!("filter {id} is not in the store"));
    }
    let (_, filter) = read_filter_file(Path::new(arg))?;
    Ok(filter)
}

pub fn load_network(path: &Path) -> Result<(Network, Diagnostics)> {
    let document = NetworkDocument::from_path(path)
        .with_context(|| format!("loading network {}", path.display()))?;
    let (network, diagnostics) = document.into_network();
    if diagnostics.has_issues() {
        warn!(network = %path.display(), "{}", diagnostics.summary());
    }
    Ok((network, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsift_core::EquipmentKind;

    const LIST: &str = r#"{
        "type": "IDENTIFIER_LIST",
        "equipmentType": "LOAD",
        "filterEquipmentsAttributes": [{ "equipmentID": "l1" }]
    }"#;

    #[test]
    fn test_bare_and_stored_filter_files() {
        let dir = tempfile::tempdir().unwrap();
        let bare = dir.path().join("bare.json");
        fs::write(&bare, LIST).unwrap();
        let (id, filter) = read_filter_file(&bare).unwrap();
        assert!(id.is_none());
        assert_eq!(filter.equipment_kind(), Some(EquipmentKind::Load));

        let stored = dir.path().join("stored.json");
        fs::write(
            &stored,
            format!(r#"{{ "id": "7928181c-7977-4592-ba19-88027e4254e4", "filter": {LIST} }}"#),
        )
        .unwrap();
        let (id, _) = read_filter_file(&stored).unwrap();
        assert_eq!(
            id.map(|id| id.to_string()).as_deref(),
            Some("7928181c-7977-4592-ba19-88027e4254e4")
        );
    }

    #[test]
    fn test_store_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            format!(r#"{{ "id": "7928181c-7977-4592-ba19-88027e4254e4", "filter": {LIST} }}"#),
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not a filter").unwrap();

        let store = load_store(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(resolve_filter("7928181c-7977-4592-ba19-88027e4254e4", &store).is_ok());
        assert!(resolve_filter("00000000-0000-4000-8000-000000000000", &store).is_err());
    }

    #[test]
    fn test_malformed_store_file_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        let err = load_store(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }
}
