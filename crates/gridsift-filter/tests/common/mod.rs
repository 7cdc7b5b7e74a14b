#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::PathBuf;

use gridsift_core::{EquipmentKind, Network, NetworkDocument};
use gridsift_filter::{
    ExpertFilter, ExpertRule, FieldType, Filter, FilterSelector, IdentifiableAttributes,
    InMemoryFilterStore, OperatorType,
};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Three substations (FR, BE, FR), four voltage levels (400, 225, 90 and an
/// unlocated 63 kV), generators g1..g4, two lines, a two- and a
/// three-winding transformer and one HVDC link.
pub fn fixture_network() -> Network {
    let document = NetworkDocument::from_path(&fixture_path("network.json")).unwrap();
    let (network, diagnostics) = document.into_network();
    assert!(!diagnostics.has_issues(), "{}", diagnostics);
    network
}

pub fn ids(selected: &[IdentifiableAttributes]) -> Vec<String> {
    selected.iter().map(|a| a.id.to_string()).collect()
}

pub fn id_set(selected: &[IdentifiableAttributes]) -> BTreeSet<String> {
    selected.iter().map(|a| a.id.to_string()).collect()
}

pub fn select(filter: impl Into<Filter>, network: &Network, kind: EquipmentKind) -> Vec<String> {
    let store = InMemoryFilterStore::new();
    let selector = FilterSelector::new(&store);
    ids(&selector.select(&filter.into(), network, kind).unwrap())
}

/// Expert filter with a single leaf under an AND.
pub fn expert(kind: EquipmentKind, leaf: ExpertRule) -> Filter {
    Filter::Expert(ExpertFilter::new(kind, ExpertRule::and(vec![leaf])))
}

pub fn name_contains(value: &str) -> ExpertRule {
    ExpertRule::string(FieldType::Name, OperatorType::Contains, value)
}
