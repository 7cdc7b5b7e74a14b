//! # gridsift-core: read-only network model
//!
//! The equipment graph that filters are evaluated against.
//!
//! ## Design
//!
//! The network is an **undirected graph** where:
//! - **Nodes**: substations, voltage levels, buses and single-terminal
//!   equipment (injections), plus three-winding transformers
//! - **Edges**: lines and two-winding transformers between voltage levels,
//!   HVDC lines between converter stations
//!
//! Every piece of equipment carries a unique string [`EquipmentId`] and
//! references the voltage level (or converter station) it is attached to by
//! id. Voltage levels optionally belong to a substation, which carries the
//! country code and free-form properties that criteria filters look at.
//!
//! ## Quick Start
//!
//! ```rust
//! use gridsift_core::*;
//!
//! let mut network = Network::new();
//! network
//!     .add_node(Node::Substation(Substation {
//!         id: "S1".into(),
//!         name: Some("Substation-1".into()),
//!         country: Some("FR".into()),
//!         ..Substation::default()
//!     }))
//!     .unwrap();
//! network
//!     .add_node(Node::VoltageLevel(VoltageLevel {
//!         id: "VL1".into(),
//!         substation: Some("S1".into()),
//!         nominal_v: Kilovolts(400.0),
//!         ..VoltageLevel::default()
//!     }))
//!     .unwrap();
//! network
//!     .add_node(Node::Generator(Generator::new("G1", "VL1")))
//!     .unwrap();
//!
//! let gens = network.identifiables(EquipmentKind::Generator);
//! assert_eq!(gens.len(), 1);
//! assert_eq!(gens[0].country(), Some("FR"));
//! ```
//!
//! ## Modules
//!
//! - [`network`] - graph container, borrowed equipment views, statistics
//! - [`document`] - JSON document form of a network
//! - [`diagnostics`] - issues collected while loading a document
//! - [`units`] - kV / MW / Mvar newtypes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub mod diagnostics;
pub mod document;
pub mod error;
pub mod network;
pub mod units;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use document::NetworkDocument;
pub use error::{GridError, GridResult};
pub use network::{Identifiable, Network, NetworkStats, Terminal};
pub use units::{Kilovolts, Megavars, Megawatts};

/// Free-form key/value properties attached to any equipment.
pub type Properties = BTreeMap<String, String>;

/// Unique equipment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquipmentId(String);

impl EquipmentId {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        EquipmentId(value.into())
    }
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EquipmentId {
    fn from(value: &str) -> Self {
        EquipmentId(value.to_string())
    }
}

impl From<String> for EquipmentId {
    fn from(value: String) -> Self {
        EquipmentId(value)
    }
}

impl std::borrow::Borrow<str> for EquipmentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The fixed set of equipment kinds a network can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentKind {
    Generator,
    Load,
    Battery,
    StaticVarCompensator,
    ShuntCompensator,
    DanglingLine,
    LccConverterStation,
    VscConverterStation,
    BusbarSection,
    Bus,
    Line,
    TwoWindingsTransformer,
    ThreeWindingsTransformer,
    HvdcLine,
    VoltageLevel,
    Substation,
}

impl EquipmentKind {
    pub const ALL: [EquipmentKind; 16] = [
        EquipmentKind::Generator,
        EquipmentKind::Load,
        EquipmentKind::Battery,
        EquipmentKind::StaticVarCompensator,
        EquipmentKind::ShuntCompensator,
        EquipmentKind::DanglingLine,
        EquipmentKind::LccConverterStation,
        EquipmentKind::VscConverterStation,
        EquipmentKind::BusbarSection,
        EquipmentKind::Bus,
        EquipmentKind::Line,
        EquipmentKind::TwoWindingsTransformer,
        EquipmentKind::ThreeWindingsTransformer,
        EquipmentKind::HvdcLine,
        EquipmentKind::VoltageLevel,
        EquipmentKind::Substation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentKind::Generator => "GENERATOR",
            EquipmentKind::Load => "LOAD",
            EquipmentKind::Battery => "BATTERY",
            EquipmentKind::StaticVarCompensator => "STATIC_VAR_COMPENSATOR",
            EquipmentKind::ShuntCompensator => "SHUNT_COMPENSATOR",
            EquipmentKind::DanglingLine => "DANGLING_LINE",
            EquipmentKind::LccConverterStation => "LCC_CONVERTER_STATION",
            EquipmentKind::VscConverterStation => "VSC_CONVERTER_STATION",
            EquipmentKind::BusbarSection => "BUSBAR_SECTION",
            EquipmentKind::Bus => "BUS",
            EquipmentKind::Line => "LINE",
            EquipmentKind::TwoWindingsTransformer => "TWO_WINDINGS_TRANSFORMER",
            EquipmentKind::ThreeWindingsTransformer => "THREE_WINDINGS_TRANSFORMER",
            EquipmentKind::HvdcLine => "HVDC_LINE",
            EquipmentKind::VoltageLevel => "VOLTAGE_LEVEL",
            EquipmentKind::Substation => "SUBSTATION",
        }
    }
}

impl fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipmentKind {
    type Err = GridError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_ascii_uppercase().replace('-', "_");
        EquipmentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| GridError::Parse(format!("unknown equipment kind '{}'", input)))
    }
}

/// Primary energy source of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergySource {
    Hydro,
    Nuclear,
    Wind,
    Thermal,
    Solar,
    #[default]
    Other,
}

impl EnergySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergySource::Hydro => "HYDRO",
            EnergySource::Nuclear => "NUCLEAR",
            EnergySource::Wind => "WIND",
            EnergySource::Thermal => "THERMAL",
            EnergySource::Solar => "SOLAR",
            EnergySource::Other => "OTHER",
        }
    }
}

impl fmt::Display for EnergySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnergySource {
    type Err = GridError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_uppercase().as_str() {
            "HYDRO" => Ok(EnergySource::Hydro),
            "NUCLEAR" => Ok(EnergySource::Nuclear),
            "WIND" => Ok(EnergySource::Wind),
            "THERMAL" => Ok(EnergySource::Thermal),
            "SOLAR" => Ok(EnergySource::Solar),
            "OTHER" => Ok(EnergySource::Other),
            _ => Err(GridError::Parse(format!("unknown energy source '{}'", input))),
        }
    }
}

/// How a voltage level describes its internal topology.
///
/// Buses of node-breaker voltage levels are computed views and are costly to
/// enumerate, which is why bus selection accepts a topology hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopologyKind {
    NodeBreaker,
    #[default]
    BusBreaker,
}

// Basic component structs

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Substation {
    pub id: EquipmentId,
    #[serde(default)]
    pub name: Option<String>,
    /// ISO country code (e.g. "FR")
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoltageLevel {
    pub id: EquipmentId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub substation: Option<EquipmentId>,
    pub nominal_v: Kilovolts,
    #[serde(default)]
    pub topology_kind: TopologyKind,
    #[serde(default)]
    pub properties: Properties,
}

/// Bus-breaker bus of a voltage level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bus {
    pub id: EquipmentId,
    #[serde(default)]
    pub name: Option<String>,
    pub voltage_level: EquipmentId,
    #[serde(default)]
    pub properties: Properties,
}

/// Single-terminal equipment without kind-specific attributes (static var
/// compensators, shunts, dangling lines, converter stations, busbar sections).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Injection {
    pub id: EquipmentId,
    #[serde(default)]
    pub name: Option<String>,
    pub voltage_level: EquipmentId,
    #[serde(default)]
    pub properties: Properties,
}

impl Injection {
    pub fn new(id: impl Into<EquipmentId>, voltage_level: impl Into<EquipmentId>) -> Self {
        Self {
            id: id.into(),
            voltage_level: voltage_level.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generator {
    pub id: EquipmentId,
    #[serde(default)]
    pub name: Option<String>,
    pub voltage_level: EquipmentId,
    #[serde(default)]
    pub energy_source: EnergySource,
    /// Minimum active power output
    #[serde(default)]
    pub min_p: Megawatts,
    /// Maximum active power output
    #[serde(default)]
    pub max_p: Megawatts,
    #[serde(default)]
    pub target_p: Megawatts,
    #[serde(default)]
    pub target_q: Megavars,
    /// Voltage setpoint
    #[serde(default)]
    pub target_v: Kilovolts,
    #[serde(default)]
    pub voltage_regulator_on: bool,
    /// Planned set-point from the active power control extension, when present
    #[serde(default)]
    pub planned_active_power_set_point: Option<Megawatts>,
    #[serde(default)]
    pub properties: Properties,
}

impl Generator {
    /// Create a new generator with zeroed set-points
    pub fn new(id: impl Into<EquipmentId>, voltage_level: impl Into<EquipmentId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            voltage_level: voltage_level.into(),
            energy_source: EnergySource::Other,
            min_p: Megawatts(0.0),
            max_p: Megawatts(0.0),
            target_p: Megawatts(0.0),
            target_q: Megavars(0.0),
            target_v: Kilovolts(0.0),
            voltage_regulator_on: false,
            planned_active_power_set_point: None,
            properties: Properties::new(),
        }
    }

    /// Set active power limits (in MW)
    pub fn with_p_limits(mut self, min_p: f64, max_p: f64) -> Self {
        self.min_p = Megawatts(min_p);
        self.max_p = Megawatts(max_p);
        self
    }

    pub fn with_energy_source(mut self, source: EnergySource) -> Self {
        self.energy_source = source;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Load {
    pub id: EquipmentId,
    #[serde(default)]
    pub name: Option<String>,
    pub voltage_level: EquipmentId,
    /// Constant active power demand
    #[serde(default)]
    pub p0: Megawatts,
    /// Constant reactive power demand
    #[serde(default)]
    pub q0: Megavars,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Battery {
    pub id: EquipmentId,
    #[serde(default)]
    pub name: Option<String>,
    pub voltage_level: EquipmentId,
    #[serde(default)]
    pub min_p: Megawatts,
    #[serde(default)]
    pub max_p: Megawatts,
    #[serde(default)]
    pub target_p: Megawatts,
    #[serde(default)]
    pub target_q: Megavars,
    #[serde(default)]
    pub properties: Properties,
}

/// Two-terminal branch: an AC line or a two-winding transformer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Branch {
    pub id: EquipmentId,
    #[serde(default)]
    pub name: Option<String>,
    pub voltage_level1: EquipmentId,
    pub voltage_level2: EquipmentId,
    #[serde(default)]
    pub properties: Properties,
}

impl Branch {
    pub fn new(
        id: impl Into<EquipmentId>,
        voltage_level1: impl Into<EquipmentId>,
        voltage_level2: impl Into<EquipmentId>,
    ) -> Self {
        Self {
            id: id.into(),
            voltage_level1: voltage_level1.into(),
            voltage_level2: voltage_level2.into(),
            ..Self::default()
        }
    }
}

/// HVDC link between two converter stations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HvdcLine {
    pub id: EquipmentId,
    #[serde(default)]
    pub name: Option<String>,
    pub converter_station1: EquipmentId,
    pub converter_station2: EquipmentId,
    pub nominal_v: Kilovolts,
    #[serde(default)]
    pub properties: Properties,
}

/// Transformer with three legs, each attached to its own voltage level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreeWindingsTransformer {
    pub id: EquipmentId,
    #[serde(default)]
    pub name: Option<String>,
    pub leg1: EquipmentId,
    pub leg2: EquipmentId,
    pub leg3: EquipmentId,
    #[serde(default)]
    pub properties: Properties,
}

// Enum to represent different types of nodes in the graph
#[derive(Debug, Clone)]
pub enum Node {
    Substation(Substation),
    VoltageLevel(VoltageLevel),
    Bus(Bus),
    BusbarSection(Injection),
    Generator(Generator),
    Load(Load),
    Battery(Battery),
    StaticVarCompensator(Injection),
    ShuntCompensator(Injection),
    DanglingLine(Injection),
    LccConverterStation(Injection),
    VscConverterStation(Injection),
    ThreeWindingsTransformer(ThreeWindingsTransformer),
}

// Enum to represent different types of edges in the graph
#[derive(Debug, Clone)]
pub enum Edge {
    Line(Branch),
    TwoWindingsTransformer(Branch),
    HvdcLine(HvdcLine),
}

impl Node {
    pub fn id(&self) -> &EquipmentId {
        match self {
            Node::Substation(s) => &s.id,
            Node::VoltageLevel(vl) => &vl.id,
            Node::Bus(b) => &b.id,
            Node::Generator(g) => &g.id,
            Node::Load(l) => &l.id,
            Node::Battery(b) => &b.id,
            Node::BusbarSection(i)
            | Node::StaticVarCompensator(i)
            | Node::ShuntCompensator(i)
            | Node::DanglingLine(i)
            | Node::LccConverterStation(i)
            | Node::VscConverterStation(i) => &i.id,
            Node::ThreeWindingsTransformer(t) => &t.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Substation(s) => s.name.as_deref(),
            Node::VoltageLevel(vl) => vl.name.as_deref(),
            Node::Bus(b) => b.name.as_deref(),
            Node::Generator(g) => g.name.as_deref(),
            Node::Load(l) => l.name.as_deref(),
            Node::Battery(b) => b.name.as_deref(),
            Node::BusbarSection(i)
            | Node::StaticVarCompensator(i)
            | Node::ShuntCompensator(i)
            | Node::DanglingLine(i)
            | Node::LccConverterStation(i)
            | Node::VscConverterStation(i) => i.name.as_deref(),
            Node::ThreeWindingsTransformer(t) => t.name.as_deref(),
        }
    }

    pub fn kind(&self) -> EquipmentKind {
        match self {
            Node::Substation(_) => EquipmentKind::Substation,
            Node::VoltageLevel(_) => EquipmentKind::VoltageLevel,
            Node::Bus(_) => EquipmentKind::Bus,
            Node::BusbarSection(_) => EquipmentKind::BusbarSection,
            Node::Generator(_) => EquipmentKind::Generator,
            Node::Load(_) => EquipmentKind::Load,
            Node::Battery(_) => EquipmentKind::Battery,
            Node::StaticVarCompensator(_) => EquipmentKind::StaticVarCompensator,
            Node::ShuntCompensator(_) => EquipmentKind::ShuntCompensator,
            Node::DanglingLine(_) => EquipmentKind::DanglingLine,
            Node::LccConverterStation(_) => EquipmentKind::LccConverterStation,
            Node::VscConverterStation(_) => EquipmentKind::VscConverterStation,
            Node::ThreeWindingsTransformer(_) => EquipmentKind::ThreeWindingsTransformer,
        }
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Node::Substation(s) => &s.properties,
            Node::VoltageLevel(vl) => &vl.properties,
            Node::Bus(b) => &b.properties,
            Node::Generator(g) => &g.properties,
            Node::Load(l) => &l.properties,
            Node::Battery(b) => &b.properties,
            Node::BusbarSection(i)
            | Node::StaticVarCompensator(i)
            | Node::ShuntCompensator(i)
            | Node::DanglingLine(i)
            | Node::LccConverterStation(i)
            | Node::VscConverterStation(i) => &i.properties,
            Node::ThreeWindingsTransformer(t) => &t.properties,
        }
    }

    /// Voltage levels this node is attached to, in terminal order.
    pub fn voltage_level_refs(&self) -> Vec<&EquipmentId> {
        match self {
            Node::Substation(_) | Node::VoltageLevel(_) => Vec::new(),
            Node::Bus(b) => vec![&b.voltage_level],
            Node::Generator(g) => vec![&g.voltage_level],
            Node::Load(l) => vec![&l.voltage_level],
            Node::Battery(b) => vec![&b.voltage_level],
            Node::BusbarSection(i)
            | Node::StaticVarCompensator(i)
            | Node::ShuntCompensator(i)
            | Node::DanglingLine(i)
            | Node::LccConverterStation(i)
            | Node::VscConverterStation(i) => vec![&i.voltage_level],
            Node::ThreeWindingsTransformer(t) => vec![&t.leg1, &t.leg2, &t.leg3],
        }
    }
}

impl Edge {
    pub fn id(&self) -> &EquipmentId {
        match self {
            Edge::Line(b) | Edge::TwoWindingsTransformer(b) => &b.id,
            Edge::HvdcLine(h) => &h.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Edge::Line(b) | Edge::TwoWindingsTransformer(b) => b.name.as_deref(),
            Edge::HvdcLine(h) => h.name.as_deref(),
        }
    }

    pub fn kind(&self) -> EquipmentKind {
        match self {
            Edge::Line(_) => EquipmentKind::Line,
            Edge::TwoWindingsTransformer(_) => EquipmentKind::TwoWindingsTransformer,
            Edge::HvdcLine(_) => EquipmentKind::HvdcLine,
        }
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Edge::Line(b) | Edge::TwoWindingsTransformer(b) => &b.properties,
            Edge::HvdcLine(h) => &h.properties,
        }
    }

    /// Ids of the two graph nodes this edge connects.
    pub fn endpoints(&self) -> (&EquipmentId, &EquipmentId) {
        match self {
            Edge::Line(b) | Edge::TwoWindingsTransformer(b) => {
                (&b.voltage_level1, &b.voltage_level2)
            }
            Edge::HvdcLine(h) => (&h.converter_station1, &h.converter_station2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equipment_kind_parsing() {
        assert_eq!(
            "TWO_WINDINGS_TRANSFORMER".parse::<EquipmentKind>().unwrap(),
            EquipmentKind::TwoWindingsTransformer
        );
        assert_eq!(
            "hvdc-line".parse::<EquipmentKind>().unwrap(),
            EquipmentKind::HvdcLine
        );
        assert!(matches!(
            "TURBINE".parse::<EquipmentKind>(),
            Err(GridError::Parse(_))
        ));
    }

    #[test]
    fn test_equipment_kind_serde_names() {
        let json = serde_json::to_string(&EquipmentKind::StaticVarCompensator).unwrap();
        assert_eq!(json, "\"STATIC_VAR_COMPENSATOR\"");
        for kind in EquipmentKind::ALL {
            let parsed: EquipmentKind =
                serde_json::from_str(&format!("\"{}\"", kind.as_str())).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_energy_source_round_trip() {
        assert_eq!("nuclear".parse::<EnergySource>().unwrap(), EnergySource::Nuclear);
        assert_eq!(EnergySource::Wind.to_string(), "WIND");
        assert!("COAL".parse::<EnergySource>().is_err());
    }

    #[test]
    fn test_node_identity() {
        let node = Node::Load(Load {
            id: "LOAD-1".into(),
            voltage_level: "VL1".into(),
            ..Load::default()
        });
        assert_eq!(node.id().as_str(), "LOAD-1");
        assert_eq!(node.name(), None);
        assert_eq!(node.kind(), EquipmentKind::Load);

        let gen = Node::Generator(Generator::new("G1", "VL1").with_name("Gen one"));
        assert_eq!(gen.name(), Some("Gen one"));
    }
}
