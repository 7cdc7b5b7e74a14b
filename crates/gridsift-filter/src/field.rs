//! Field extraction for expert rules.
//!
//! Each accessor reads the fields of one family of equipment. A field the
//! equipment has no value for (an unlocated voltage level, a substation
//! without country, a generator without planned set-point) is `None`; the
//! registry decides which fields a kind supports at all.

use std::fmt;

use gridsift_core::{Identifiable, Node};

use crate::rule::FieldType;

/// Extracted value of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl FieldValue {
    /// Numeric view; text is parsed, booleans have none.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::String(text) => text.trim().parse().ok(),
            FieldValue::Boolean(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(value) => Some(*value),
            FieldValue::String(text) => text.trim().parse().ok(),
            FieldValue::Number(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(text) => f.write_str(text),
            FieldValue::Number(value) => write!(f, "{}", value),
            FieldValue::Boolean(value) => write!(f, "{}", value),
        }
    }
}

/// Reads one field of one equipment.
pub type FieldAccessor = fn(FieldType, &Identifiable<'_>) -> Option<FieldValue>;

fn text(value: &str) -> Option<FieldValue> {
    Some(FieldValue::String(value.to_string()))
}

fn number(value: f64) -> Option<FieldValue> {
    Some(FieldValue::Number(value))
}

/// Fields every kind shares.
pub fn identity_field(field: FieldType, eq: &Identifiable<'_>) -> Option<FieldValue> {
    match field {
        FieldType::Id => text(eq.id().as_str()),
        FieldType::Name => text(eq.name_or_id()),
        _ => None,
    }
}

/// Location fields of anything attached to a voltage level.
pub fn located_field(field: FieldType, eq: &Identifiable<'_>) -> Option<FieldValue> {
    match field {
        FieldType::NominalVoltage => eq.nominal_v().and_then(|v| number(v.value())),
        FieldType::Country => eq.country().and_then(text),
        FieldType::VoltageLevelId => eq.voltage_level().and_then(|vl| text(vl.id.as_str())),
        FieldType::SubstationId => eq.substation().and_then(|s| text(s.id.as_str())),
        _ => identity_field(field, eq),
    }
}

pub fn generator_field(field: FieldType, eq: &Identifiable<'_>) -> Option<FieldValue> {
    let Some(Node::Generator(generator)) = eq.as_node() else {
        return located_field(field, eq);
    };
    match field {
        FieldType::MinP => number(generator.min_p.value()),
        FieldType::MaxP => number(generator.max_p.value()),
        FieldType::TargetP => number(generator.target_p.value()),
        FieldType::TargetV => number(generator.target_v.value()),
        FieldType::TargetQ => number(generator.target_q.value()),
        FieldType::EnergySource => text(generator.energy_source.as_str()),
        FieldType::VoltageRegulatorOn => Some(FieldValue::Boolean(generator.voltage_regulator_on)),
        FieldType::PlannedActivePowerSetPoint => generator
            .planned_active_power_set_point
            .and_then(|p| number(p.value())),
        _ => located_field(field, eq),
    }
}

pub fn load_field(field: FieldType, eq: &Identifiable<'_>) -> Option<FieldValue> {
    let Some(Node::Load(load)) = eq.as_node() else {
        return located_field(field, eq);
    };
    match field {
        FieldType::P0 => number(load.p0.value()),
        FieldType::Q0 => number(load.q0.value()),
        _ => located_field(field, eq),
    }
}

pub fn battery_field(field: FieldType, eq: &Identifiable<'_>) -> Option<FieldValue> {
    let Some(Node::Battery(battery)) = eq.as_node() else {
        return located_field(field, eq);
    };
    match field {
        FieldType::MinP => number(battery.min_p.value()),
        FieldType::MaxP => number(battery.max_p.value()),
        FieldType::TargetP => number(battery.target_p.value()),
        FieldType::TargetQ => number(battery.target_q.value()),
        _ => located_field(field, eq),
    }
}

pub fn substation_field(field: FieldType, eq: &Identifiable<'_>) -> Option<FieldValue> {
    match field {
        FieldType::Country => eq.country().and_then(text),
        _ => identity_field(field, eq),
    }
}

/// HVDC lines carry their own nominal voltage.
pub fn hvdc_field(field: FieldType, eq: &Identifiable<'_>) -> Option<FieldValue> {
    match field {
        FieldType::NominalVoltage => eq.nominal_v().and_then(|v| number(v.value())),
        _ => identity_field(field, eq),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsift_core::{
        EnergySource, Generator, Kilovolts, Load, Megawatts, Network, Substation, VoltageLevel,
    };

    fn network() -> Network {
        let mut network = Network::new();
        network
            .add_node(Node::Substation(Substation {
                id: "S1".into(),
                country: Some("FR".into()),
                ..Substation::default()
            }))
            .unwrap();
        network
            .add_node(Node::VoltageLevel(VoltageLevel {
                id: "VL1".into(),
                substation: Some("S1".into()),
                nominal_v: Kilovolts(225.0),
                ..VoltageLevel::default()
            }))
            .unwrap();
        let mut generator = Generator::new("G1", "VL1")
            .with_p_limits(10.0, 250.0)
            .with_energy_source(EnergySource::Hydro);
        generator.voltage_regulator_on = true;
        network.add_node(Node::Generator(generator)).unwrap();
        network
            .add_node(Node::Load(Load {
                id: "LD1".into(),
                voltage_level: "VL1".into(),
                p0: Megawatts(42.0),
                ..Load::default()
            }))
            .unwrap();
        network
    }

    #[test]
    fn test_generator_fields() {
        let network = network();
        let g = network.identifiable("G1").unwrap();
        assert_eq!(generator_field(FieldType::MaxP, &g), Some(FieldValue::Number(250.0)));
        assert_eq!(
            generator_field(FieldType::EnergySource, &g),
            Some(FieldValue::String("HYDRO".into()))
        );
        assert_eq!(
            generator_field(FieldType::VoltageRegulatorOn, &g),
            Some(FieldValue::Boolean(true))
        );
        assert_eq!(generator_field(FieldType::PlannedActivePowerSetPoint, &g), None);
        assert_eq!(
            generator_field(FieldType::Country, &g),
            Some(FieldValue::String("FR".into()))
        );
        assert_eq!(
            generator_field(FieldType::VoltageLevelId, &g),
            Some(FieldValue::String("VL1".into()))
        );
    }

    #[test]
    fn test_load_and_location_fields() {
        let network = network();
        let load = network.identifiable("LD1").unwrap();
        assert_eq!(load_field(FieldType::P0, &load), Some(FieldValue::Number(42.0)));
        assert_eq!(
            load_field(FieldType::NominalVoltage, &load),
            Some(FieldValue::Number(225.0))
        );
        assert_eq!(
            load_field(FieldType::SubstationId, &load),
            Some(FieldValue::String("S1".into()))
        );

        let vl = network.identifiable("VL1").unwrap();
        assert_eq!(
            located_field(FieldType::Country, &vl),
            Some(FieldValue::String("FR".into()))
        );
    }

    #[test]
    fn test_value_views() {
        assert_eq!(FieldValue::String(" 12.5".into()).as_number(), Some(12.5));
        assert_eq!(FieldValue::Boolean(true).as_number(), None);
        assert_eq!(FieldValue::String("false".into()).as_bool(), Some(false));
        assert_eq!(FieldValue::Number(400.0).to_string(), "400");
    }
}
