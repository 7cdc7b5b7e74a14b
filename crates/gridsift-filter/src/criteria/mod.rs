//! Criteria filters: fixed attribute forms, one per equipment kind.
//!
//! Every attribute of a form is optional and an unset attribute places no
//! constraint, so an empty form selects every equipment of its kind.
//!
//! Multi-terminal equipment is matched without regard to terminal order:
//! - lines and HVDC lines accept either assignment of the (…1, …2) attribute
//!   pairs to their two terminals
//! - two-winding transformers do the same for voltages and accept any
//!   terminal for country, substation properties and substation name
//! - three-winding transformers accept any assignment of the three voltage
//!   filters to their legs and any leg for the other attributes

pub mod predicates;

use std::collections::BTreeSet;

use gridsift_core::{EnergySource, EquipmentKind, Identifiable, Node, Terminal};
use serde::{Deserialize, Serialize};

use crate::numeric::{self, NumericFilter};
use predicates::{
    any_permutation, country_matches, free_properties_match, pattern_matches,
    substation_name_matches, symmetric, terminal_country_matches, terminal_properties_match,
    terminal_voltage_matches,
};
pub use predicates::{FreeProperties, NamePattern};

/// Id and name patterns common to every form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentIdentity {
    #[serde(default, rename = "equipmentID", skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<NamePattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_name: Option<NamePattern>,
}

impl EquipmentIdentity {
    pub fn matches(&self, eq: &Identifiable<'_>) -> bool {
        pattern_matches(self.equipment_id.as_ref(), eq.id().as_str())
            && pattern_matches(self.equipment_name.as_ref(), eq.name_or_id())
    }

    pub fn is_empty(&self) -> bool {
        self.equipment_id.is_none() && self.equipment_name.is_none()
    }
}

/// Single-terminal equipment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InjectionFilter {
    #[serde(flatten)]
    pub identity: EquipmentIdentity,
    pub substation_name: Option<String>,
    pub countries: BTreeSet<String>,
    /// Properties of the equipment itself
    pub free_properties: FreeProperties,
    pub substation_free_properties: FreeProperties,
    pub nominal_voltage: Option<NumericFilter>,
}

impl InjectionFilter {
    pub fn matches(&self, eq: &Identifiable<'_>) -> bool {
        let terminal = eq.terminals().first().copied();
        let substation = terminal.and_then(|t| t.substation);
        self.identity.matches(eq)
            && free_properties_match(&self.free_properties, Some(eq.properties()))
            && numeric::matches_optional(
                self.nominal_voltage.as_ref(),
                terminal.map(|t| t.nominal_v().value()),
            )
            && country_matches(&self.countries, terminal.and_then(|t| t.country()))
            && substation_name_matches(self.substation_name.as_deref(), substation)
            && free_properties_match(
                &self.substation_free_properties,
                substation.map(|s| &s.properties),
            )
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_empty()
            && self.substation_name.is_none()
            && self.countries.is_empty()
            && self.free_properties.is_empty()
            && self.substation_free_properties.is_empty()
            && self.nominal_voltage.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorFilter {
    #[serde(flatten)]
    pub injection: InjectionFilter,
    pub energy_source: Option<EnergySource>,
}

impl GeneratorFilter {
    pub fn matches(&self, eq: &Identifiable<'_>) -> bool {
        let source_matches = match (self.energy_source, eq.as_node()) {
            (None, _) => true,
            (Some(source), Some(Node::Generator(generator))) => generator.energy_source == source,
            (Some(_), _) => false,
        };
        source_matches && self.injection.matches(eq)
    }

    pub fn is_empty(&self) -> bool {
        self.injection.is_empty() && self.energy_source.is_none()
    }
}

/// AC lines. Pairs (…1, …2) may match the terminals in either order; the
/// substation names are checked per side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineFilter {
    #[serde(flatten)]
    pub identity: EquipmentIdentity,
    pub substation_name1: Option<String>,
    pub substation_name2: Option<String>,
    pub countries1: BTreeSet<String>,
    pub countries2: BTreeSet<String>,
    pub free_properties1: FreeProperties,
    pub free_properties2: FreeProperties,
    pub nominal_voltage1: Option<NumericFilter>,
    pub nominal_voltage2: Option<NumericFilter>,
}

impl LineFilter {
    pub fn matches(&self, eq: &Identifiable<'_>) -> bool {
        let terminals = eq.terminals();
        let [t1, t2] = terminals.as_slice() else {
            return false;
        };
        self.identity.matches(eq)
            && symmetric(
                (t1, t2),
                (self.nominal_voltage1.as_ref(), self.nominal_voltage2.as_ref()),
                |t, f| terminal_voltage_matches(f, t),
            )
            && symmetric(
                (t1, t2),
                (&self.countries1, &self.countries2),
                |t, f| terminal_country_matches(f, t),
            )
            && symmetric(
                (t1, t2),
                (&self.free_properties1, &self.free_properties2),
                |t, f| terminal_properties_match(f, t),
            )
            && substation_name_matches(self.substation_name1.as_deref(), t1.substation)
            && substation_name_matches(self.substation_name2.as_deref(), t2.substation)
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_empty()
            && self.substation_name1.is_none()
            && self.substation_name2.is_none()
            && self.countries1.is_empty()
            && self.countries2.is_empty()
            && self.free_properties1.is_empty()
            && self.free_properties2.is_empty()
            && self.nominal_voltage1.is_none()
            && self.nominal_voltage2.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwoWindingsTransformerFilter {
    #[serde(flatten)]
    pub identity: EquipmentIdentity,
    pub substation_name: Option<String>,
    pub countries: BTreeSet<String>,
    pub substation_free_properties: FreeProperties,
    pub nominal_voltage1: Option<NumericFilter>,
    pub nominal_voltage2: Option<NumericFilter>,
}

impl TwoWindingsTransformerFilter {
    pub fn matches(&self, eq: &Identifiable<'_>) -> bool {
        let terminals = eq.terminals();
        let [t1, t2] = terminals.as_slice() else {
            return false;
        };
        self.identity.matches(eq)
            && symmetric(
                (t1, t2),
                (self.nominal_voltage1.as_ref(), self.nominal_voltage2.as_ref()),
                |t, f| terminal_voltage_matches(f, t),
            )
            && any_terminal(
                &terminals,
                &self.countries,
                &self.substation_free_properties,
                self.substation_name.as_deref(),
            )
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_empty()
            && self.substation_name.is_none()
            && self.countries.is_empty()
            && self.substation_free_properties.is_empty()
            && self.nominal_voltage1.is_none()
            && self.nominal_voltage2.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreeWindingsTransformerFilter {
    #[serde(flatten)]
    pub identity: EquipmentIdentity,
    pub substation_name: Option<String>,
    pub countries: BTreeSet<String>,
    pub substation_free_properties: FreeProperties,
    pub nominal_voltage1: Option<NumericFilter>,
    pub nominal_voltage2: Option<NumericFilter>,
    pub nominal_voltage3: Option<NumericFilter>,
}

impl ThreeWindingsTransformerFilter {
    pub fn matches(&self, eq: &Identifiable<'_>) -> bool {
        let terminals = eq.terminals();
        let [t1, t2, t3] = terminals.as_slice() else {
            return false;
        };
        self.identity.matches(eq)
            && any_permutation(
                [t1, t2, t3],
                [
                    self.nominal_voltage1.as_ref(),
                    self.nominal_voltage2.as_ref(),
                    self.nominal_voltage3.as_ref(),
                ],
                |t, f| terminal_voltage_matches(f, t),
            )
            && any_terminal(
                &terminals,
                &self.countries,
                &self.substation_free_properties,
                self.substation_name.as_deref(),
            )
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_empty()
            && self.substation_name.is_none()
            && self.countries.is_empty()
            && self.substation_free_properties.is_empty()
            && self.nominal_voltage1.is_none()
            && self.nominal_voltage2.is_none()
            && self.nominal_voltage3.is_none()
    }
}

/// Country, substation properties and substation name each hold on some
/// terminal, not necessarily the same one.
fn any_terminal(
    terminals: &[Terminal<'_>],
    countries: &BTreeSet<String>,
    properties: &FreeProperties,
    substation_name: Option<&str>,
) -> bool {
    terminals.iter().any(|t| terminal_country_matches(countries, t))
        && terminals.iter().any(|t| terminal_properties_match(properties, t))
        && terminals
            .iter()
            .any(|t| substation_name_matches(substation_name, t.substation))
}

/// HVDC lines. Terminals are the converter stations' voltage levels; the
/// nominal voltage is the line's own rating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HvdcLineFilter {
    #[serde(flatten)]
    pub identity: EquipmentIdentity,
    pub substation_name1: Option<String>,
    pub substation_name2: Option<String>,
    pub countries1: BTreeSet<String>,
    pub countries2: BTreeSet<String>,
    pub free_properties1: FreeProperties,
    pub free_properties2: FreeProperties,
    pub nominal_voltage: Option<NumericFilter>,
}

impl HvdcLineFilter {
    pub fn matches(&self, eq: &Identifiable<'_>) -> bool {
        let terminals = eq.terminals();
        let [t1, t2] = terminals.as_slice() else {
            return false;
        };
        self.identity.matches(eq)
            && numeric::matches_optional(
                self.nominal_voltage.as_ref(),
                eq.nominal_v().map(|v| v.value()),
            )
            && symmetric(
                (t1, t2),
                (&self.countries1, &self.countries2),
                |t, f| terminal_country_matches(f, t),
            )
            && symmetric(
                (t1, t2),
                (&self.free_properties1, &self.free_properties2),
                |t, f| terminal_properties_match(f, t),
            )
            && substation_name_matches(self.substation_name1.as_deref(), t1.substation)
            && substation_name_matches(self.substation_name2.as_deref(), t2.substation)
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_empty()
            && self.substation_name1.is_none()
            && self.substation_name2.is_none()
            && self.countries1.is_empty()
            && self.countries2.is_empty()
            && self.free_properties1.is_empty()
            && self.free_properties2.is_empty()
            && self.nominal_voltage.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoltageLevelFilter {
    #[serde(flatten)]
    pub identity: EquipmentIdentity,
    pub countries: BTreeSet<String>,
    pub substation_free_properties: FreeProperties,
    pub nominal_voltage: Option<NumericFilter>,
}

impl VoltageLevelFilter {
    pub fn matches(&self, eq: &Identifiable<'_>) -> bool {
        self.identity.matches(eq)
            && numeric::matches_optional(
                self.nominal_voltage.as_ref(),
                eq.nominal_v().map(|v| v.value()),
            )
            && country_matches(&self.countries, eq.country())
            && free_properties_match(
                &self.substation_free_properties,
                eq.substation().map(|s| &s.properties),
            )
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_empty()
            && self.countries.is_empty()
            && self.substation_free_properties.is_empty()
            && self.nominal_voltage.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubstationFilter {
    #[serde(flatten)]
    pub identity: EquipmentIdentity,
    pub countries: BTreeSet<String>,
    pub free_properties: FreeProperties,
}

impl SubstationFilter {
    pub fn matches(&self, eq: &Identifiable<'_>) -> bool {
        self.identity.matches(eq)
            && country_matches(&self.countries, eq.country())
            && free_properties_match(&self.free_properties, Some(eq.properties()))
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_empty() && self.countries.is_empty() && self.free_properties.is_empty()
    }
}

/// Criteria form tagged by the equipment kind it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "equipmentType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriteriaFilter {
    Generator(GeneratorFilter),
    Load(InjectionFilter),
    Battery(InjectionFilter),
    StaticVarCompensator(InjectionFilter),
    ShuntCompensator(InjectionFilter),
    DanglingLine(InjectionFilter),
    LccConverterStation(InjectionFilter),
    VscConverterStation(InjectionFilter),
    BusbarSection(InjectionFilter),
    Line(LineFilter),
    TwoWindingsTransformer(TwoWindingsTransformerFilter),
    ThreeWindingsTransformer(ThreeWindingsTransformerFilter),
    HvdcLine(HvdcLineFilter),
    VoltageLevel(VoltageLevelFilter),
    Substation(SubstationFilter),
}

impl CriteriaFilter {
    pub fn equipment_kind(&self) -> EquipmentKind {
        match self {
            CriteriaFilter::Generator(_) => EquipmentKind::Generator,
            CriteriaFilter::Load(_) => EquipmentKind::Load,
            CriteriaFilter::Battery(_) => EquipmentKind::Battery,
            CriteriaFilter::StaticVarCompensator(_) => EquipmentKind::StaticVarCompensator,
            CriteriaFilter::ShuntCompensator(_) => EquipmentKind::ShuntCompensator,
            CriteriaFilter::DanglingLine(_) => EquipmentKind::DanglingLine,
            CriteriaFilter::LccConverterStation(_) => EquipmentKind::LccConverterStation,
            CriteriaFilter::VscConverterStation(_) => EquipmentKind::VscConverterStation,
            CriteriaFilter::BusbarSection(_) => EquipmentKind::BusbarSection,
            CriteriaFilter::Line(_) => EquipmentKind::Line,
            CriteriaFilter::TwoWindingsTransformer(_) => EquipmentKind::TwoWindingsTransformer,
            CriteriaFilter::ThreeWindingsTransformer(_) => EquipmentKind::ThreeWindingsTransformer,
            CriteriaFilter::HvdcLine(_) => EquipmentKind::HvdcLine,
            CriteriaFilter::VoltageLevel(_) => EquipmentKind::VoltageLevel,
            CriteriaFilter::Substation(_) => EquipmentKind::Substation,
        }
    }

    /// Whether `eq` satisfies the form. Equipment of another kind never
    /// matches.
    pub fn matches(&self, eq: &Identifiable<'_>) -> bool {
        if eq.kind() != self.equipment_kind() {
            return false;
        }
        match self {
            CriteriaFilter::Generator(f) => f.matches(eq),
            CriteriaFilter::Load(f)
            | CriteriaFilter::Battery(f)
            | CriteriaFilter::StaticVarCompensator(f)
            | CriteriaFilter::ShuntCompensator(f)
            | CriteriaFilter::DanglingLine(f)
            | CriteriaFilter::LccConverterStation(f)
            | CriteriaFilter::VscConverterStation(f)
            | CriteriaFilter::BusbarSection(f) => f.matches(eq),
            CriteriaFilter::Line(f) => f.matches(eq),
            CriteriaFilter::TwoWindingsTransformer(f) => f.matches(eq),
            CriteriaFilter::ThreeWindingsTransformer(f) => f.matches(eq),
            CriteriaFilter::HvdcLine(f) => f.matches(eq),
            CriteriaFilter::VoltageLevel(f) => f.matches(eq),
            CriteriaFilter::Substation(f) => f.matches(eq),
        }
    }

    /// True when no attribute is set, i.e. the form selects its whole kind.
    pub fn is_empty(&self) -> bool {
        match self {
            CriteriaFilter::Generator(f) => f.is_empty(),
            CriteriaFilter::Load(f)
            | CriteriaFilter::Battery(f)
            | CriteriaFilter::StaticVarCompensator(f)
            | CriteriaFilter::ShuntCompensator(f)
            | CriteriaFilter::DanglingLine(f)
            | CriteriaFilter::LccConverterStation(f)
            | CriteriaFilter::VscConverterStation(f)
            | CriteriaFilter::BusbarSection(f) => f.is_empty(),
            CriteriaFilter::Line(f) => f.is_empty(),
            CriteriaFilter::TwoWindingsTransformer(f) => f.is_empty(),
            CriteriaFilter::ThreeWindingsTransformer(f) => f.is_empty(),
            CriteriaFilter::HvdcLine(f) => f.is_empty(),
            CriteriaFilter::VoltageLevel(f) => f.is_empty(),
            CriteriaFilter::Substation(f) => f.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsift_core::{
        Branch, Edge, Generator, Kilovolts, Network, Substation, VoltageLevel,
    };

    fn network() -> Network {
        let mut network = Network::new();
        for (id, country) in [("S1", "FR"), ("S2", "BE")] {
            network
                .add_node(Node::Substation(Substation {
                    id: id.into(),
                    country: Some(country.into()),
                    ..Substation::default()
                }))
                .unwrap();
        }
        for (id, substation, kv) in [("VL1", "S1", 400.0), ("VL2", "S2", 225.0)] {
            network
                .add_node(Node::VoltageLevel(VoltageLevel {
                    id: id.into(),
                    substation: Some(substation.into()),
                    nominal_v: Kilovolts(kv),
                    ..VoltageLevel::default()
                }))
                .unwrap();
        }
        network
            .add_node(Node::Generator(
                Generator::new("GEN_1", "VL1").with_energy_source(EnergySource::Nuclear),
            ))
            .unwrap();
        network
            .add_edge(Edge::Line(Branch::new("LINE_1", "VL1", "VL2")))
            .unwrap();
        network
    }

    #[test]
    fn test_empty_forms_are_vacuous() {
        let network = network();
        let gens = CriteriaFilter::Generator(GeneratorFilter::default());
        assert!(gens.is_empty());
        let g = network.identifiable("GEN_1").unwrap();
        assert!(gens.matches(&g));

        let lines = CriteriaFilter::Line(LineFilter::default());
        assert!(lines.matches(&network.identifiable("LINE_1").unwrap()));
        // kind mismatch
        assert!(!lines.matches(&g));
    }

    #[test]
    fn test_generator_form() {
        let network = network();
        let g = network.identifiable("GEN_1").unwrap();

        let mut filter = GeneratorFilter::default();
        filter.energy_source = Some(EnergySource::Nuclear);
        filter.injection.countries.insert("FR".into());
        filter.injection.nominal_voltage = Some(NumericFilter::equality(400.0));
        filter.injection.identity.equipment_id = Some("GEN_*".into());
        assert!(!filter.is_empty());
        assert!(filter.matches(&g));

        filter.energy_source = Some(EnergySource::Hydro);
        assert!(!filter.matches(&g));
    }

    #[test]
    fn test_line_form_is_symmetric() {
        let network = network();
        let line = network.identifiable("LINE_1").unwrap();

        let forward = LineFilter {
            countries1: ["FR".to_string()].into(),
            countries2: ["BE".to_string()].into(),
            nominal_voltage1: Some(NumericFilter::equality(400.0)),
            nominal_voltage2: Some(NumericFilter::equality(225.0)),
            ..LineFilter::default()
        };
        let reversed = LineFilter {
            countries1: ["BE".to_string()].into(),
            countries2: ["FR".to_string()].into(),
            nominal_voltage1: Some(NumericFilter::equality(225.0)),
            nominal_voltage2: Some(NumericFilter::equality(400.0)),
            ..LineFilter::default()
        };
        assert!(forward.matches(&line));
        assert!(reversed.matches(&line));

        let both_fr = LineFilter {
            countries1: ["FR".to_string()].into(),
            countries2: ["FR".to_string()].into(),
            ..LineFilter::default()
        };
        assert!(!both_fr.matches(&line));
    }

    #[test]
    fn test_criteria_wire_shape() {
        let json = r#"{
            "equipmentType": "GENERATOR",
            "equipmentID": "GEN_*",
            "countries": ["FR"],
            "energySource": "NUCLEAR",
            "nominalVoltage": { "type": "GREATER_OR_EQUAL", "value1": 225.0 }
        }"#;
        let filter: CriteriaFilter = serde_json::from_str(json).unwrap();
        assert_eq!(filter.equipment_kind(), EquipmentKind::Generator);
        let network = network();
        assert!(filter.matches(&network.identifiable("GEN_1").unwrap()));
    }
}
