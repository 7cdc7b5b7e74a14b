//! JSON document form of a network.
//!
//! A document lists equipment per kind. [`NetworkDocument::into_network`]
//! inserts elements in dependency order (substations, voltage levels,
//! attached equipment, then branches) and records every element it has to
//! skip in a [`Diagnostics`] collection. Elements that load but carry no
//! usable nominal voltage are kept and reported as warnings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    Battery, Branch, Bus, Diagnostics, Edge, Generator, GridError, GridResult, HvdcLine,
    Injection, Kilovolts, Load, Network, Node, Substation, ThreeWindingsTransformer,
    VoltageLevel,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkDocument {
    pub substations: Vec<Substation>,
    pub voltage_levels: Vec<VoltageLevel>,
    pub buses: Vec<Bus>,
    pub busbar_sections: Vec<Injection>,
    pub generators: Vec<Generator>,
    pub loads: Vec<Load>,
    pub batteries: Vec<Battery>,
    pub static_var_compensators: Vec<Injection>,
    pub shunt_compensators: Vec<Injection>,
    pub dangling_lines: Vec<Injection>,
    pub lcc_converter_stations: Vec<Injection>,
    pub vsc_converter_stations: Vec<Injection>,
    pub three_windings_transformers: Vec<ThreeWindingsTransformer>,
    pub lines: Vec<Branch>,
    pub two_windings_transformers: Vec<Branch>,
    pub hvdc_lines: Vec<HvdcLine>,
}

impl NetworkDocument {
    pub fn from_json_str(data: &str) -> GridResult<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn from_path(path: &Path) -> GridResult<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Build the network, skipping (and reporting) elements that cannot be
    /// inserted.
    pub fn into_network(self) -> (Network, Diagnostics) {
        let mut network = Network::new();
        let mut diag = Diagnostics::new();

        let rated = self
            .voltage_levels
            .iter()
            .map(|vl| (vl.id.as_str(), vl.nominal_v))
            .chain(self.hvdc_lines.iter().map(|h| (h.id.as_str(), h.nominal_v)));
        for (id, nominal_v) in rated {
            check_nominal_voltage(&mut diag, id, nominal_v);
        }

        let nodes = self
            .substations
            .into_iter()
            .map(Node::Substation)
            .chain(self.voltage_levels.into_iter().map(Node::VoltageLevel))
            .chain(self.buses.into_iter().map(Node::Bus))
            .chain(self.busbar_sections.into_iter().map(Node::BusbarSection))
            .chain(self.generators.into_iter().map(Node::Generator))
            .chain(self.loads.into_iter().map(Node::Load))
            .chain(self.batteries.into_iter().map(Node::Battery))
            .chain(
                self.static_var_compensators
                    .into_iter()
                    .map(Node::StaticVarCompensator),
            )
            .chain(self.shunt_compensators.into_iter().map(Node::ShuntCompensator))
            .chain(self.dangling_lines.into_iter().map(Node::DanglingLine))
            .chain(
                self.lcc_converter_stations
                    .into_iter()
                    .map(Node::LccConverterStation),
            )
            .chain(
                self.vsc_converter_stations
                    .into_iter()
                    .map(Node::VscConverterStation),
            )
            .chain(
                self.three_windings_transformers
                    .into_iter()
                    .map(Node::ThreeWindingsTransformer),
            );

        for node in nodes {
            let id = node.id().to_string();
            if let Err(err) = network.add_node(node) {
                record_skip(&mut diag, &id, &err);
            }
        }

        let edges = self
            .lines
            .into_iter()
            .map(Edge::Line)
            .chain(
                self.two_windings_transformers
                    .into_iter()
                    .map(Edge::TwoWindingsTransformer),
            )
            .chain(self.hvdc_lines.into_iter().map(Edge::HvdcLine));

        for edge in edges {
            let id = edge.id().to_string();
            if let Err(err) = network.add_edge(edge) {
                record_skip(&mut diag, &id, &err);
            }
        }

        debug!(stats = %network.stats(), issues = diag.issues.len(), "network document loaded");
        (network, diag)
    }
}

fn check_nominal_voltage(diag: &mut Diagnostics, id: &str, nominal_v: Kilovolts) {
    let value = nominal_v.value();
    if !value.is_finite() || value <= 0.0 {
        warn!(equipment = id, nominal_v = value, "no usable nominal voltage");
        diag.add_warning_with_entity(
            "rating",
            &format!("Nominal voltage {value} kV is not positive"),
            id,
        );
    }
}

fn record_skip(diag: &mut Diagnostics, id: &str, err: &GridError) {
    warn!(equipment = id, error = %err, "skipping equipment");
    let category = match err {
        GridError::DuplicateId(_) => "duplicate",
        _ => "reference",
    };
    diag.add_error_with_entity(category, &err.to_string(), id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EquipmentKind;

    const DOC: &str = r#"{
        "substations": [{ "id": "S1", "country": "FR", "properties": { "region": "north" } }],
        "voltage_levels": [
            { "id": "VL1", "substation": "S1", "nominal_v": 400.0 },
            { "id": "VL2", "substation": "S1", "nominal_v": 225.0, "topology_kind": "NODE_BREAKER" }
        ],
        "generators": [
            { "id": "G1", "voltage_level": "VL1", "energy_source": "NUCLEAR", "max_p": 900.0 },
            { "id": "G2", "voltage_level": "VL7" }
        ],
        "lines": [
            { "id": "L1", "voltage_level1": "VL1", "voltage_level2": "VL2" },
            { "id": "G1", "voltage_level1": "VL1", "voltage_level2": "VL2" }
        ]
    }"#;

    #[test]
    fn test_document_loads_and_reports_skips() {
        let doc = NetworkDocument::from_json_str(DOC).unwrap();
        let (network, diag) = doc.into_network();

        assert_eq!(network.identifiables(EquipmentKind::Generator).len(), 1);
        assert_eq!(network.identifiables(EquipmentKind::Line).len(), 1);
        assert_eq!(diag.error_count(), 2);
        assert_eq!(diag.warning_count(), 0);
        let categories: Vec<&str> = diag.errors().map(|i| i.category.as_str()).collect();
        assert_eq!(categories, vec!["reference", "duplicate"]);
        assert!(diag.errors().any(|i| i.entity.as_deref() == Some("G2")));
    }

    #[test]
    fn test_unrated_equipment_is_kept_with_a_warning() {
        let doc = NetworkDocument::from_json_str(
            r#"{
                "voltage_levels": [
                    { "id": "VL1", "nominal_v": 0.0 },
                    { "id": "VL2", "nominal_v": 225.0 }
                ]
            }"#,
        )
        .unwrap();
        let (network, diag) = doc.into_network();

        assert_eq!(network.identifiables(EquipmentKind::VoltageLevel).len(), 2);
        assert_eq!(diag.error_count(), 0);
        let warnings: Vec<_> = diag.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].category, "rating");
        assert_eq!(warnings[0].entity.as_deref(), Some("VL1"));
        assert_eq!(diag.summary(), "1 warning");
    }

    #[test]
    fn test_document_defaults() {
        let doc = NetworkDocument::from_json_str(DOC).unwrap();
        let (network, _) = doc.into_network();

        let vl1 = network.voltage_level("VL1").unwrap();
        assert_eq!(vl1.topology_kind, crate::TopologyKind::BusBreaker);
        let g1 = network.identifiable("G1").unwrap();
        assert_eq!(g1.property("region"), None);
        assert_eq!(g1.substation().unwrap().properties["region"], "north");
    }

    #[test]
    fn test_malformed_document() {
        let err = NetworkDocument::from_json_str("{ \"lines\": 3 }").unwrap_err();
        assert!(matches!(err, GridError::Parse(_)));
    }
}
