//! Per-kind capability records.
//!
//! The registry is the single place that knows, for every equipment kind,
//! whether criteria forms apply, whether identifier-list selections carry
//! distribution keys, which expert fields are legal and how to read them.
//! The default table is built once and shared; callers needing a narrower
//! or extended table build their own.

use std::collections::HashMap;
use std::fmt;

use gridsift_core::{EquipmentKind, Identifiable};
use once_cell::sync::Lazy;

use crate::error::{FilterError, FilterResult};
use crate::field::{self, FieldAccessor, FieldValue};
use crate::rule::FieldType;

static DEFAULT_REGISTRY: Lazy<KindRegistry> = Lazy::new(KindRegistry::with_defaults);

const IDENTITY_FIELDS: &[FieldType] = &[FieldType::Id, FieldType::Name];

const LOCATED_FIELDS: &[FieldType] = &[
    FieldType::Id,
    FieldType::Name,
    FieldType::NominalVoltage,
    FieldType::Country,
    FieldType::VoltageLevelId,
    FieldType::SubstationId,
];

const GENERATOR_FIELDS: &[FieldType] = &[
    FieldType::Id,
    FieldType::Name,
    FieldType::NominalVoltage,
    FieldType::Country,
    FieldType::VoltageLevelId,
    FieldType::SubstationId,
    FieldType::MinP,
    FieldType::MaxP,
    FieldType::TargetP,
    FieldType::TargetV,
    FieldType::TargetQ,
    FieldType::EnergySource,
    FieldType::VoltageRegulatorOn,
    FieldType::PlannedActivePowerSetPoint,
];

const LOAD_FIELDS: &[FieldType] = &[
    FieldType::Id,
    FieldType::Name,
    FieldType::NominalVoltage,
    FieldType::Country,
    FieldType::VoltageLevelId,
    FieldType::SubstationId,
    FieldType::P0,
    FieldType::Q0,
];

const BATTERY_FIELDS: &[FieldType] = &[
    FieldType::Id,
    FieldType::Name,
    FieldType::NominalVoltage,
    FieldType::Country,
    FieldType::VoltageLevelId,
    FieldType::SubstationId,
    FieldType::MinP,
    FieldType::MaxP,
    FieldType::TargetP,
    FieldType::TargetQ,
];

const VOLTAGE_LEVEL_FIELDS: &[FieldType] = &[
    FieldType::Id,
    FieldType::Name,
    FieldType::NominalVoltage,
    FieldType::Country,
    FieldType::SubstationId,
];

const SUBSTATION_FIELDS: &[FieldType] = &[FieldType::Id, FieldType::Name, FieldType::Country];

const HVDC_FIELDS: &[FieldType] = &[FieldType::Id, FieldType::Name, FieldType::NominalVoltage];

/// What the engine can do with one equipment kind.
#[derive(Clone)]
pub struct KindCapabilities {
    pub kind: EquipmentKind,
    /// Criteria forms exist for the kind
    pub criteria: bool,
    /// Identifier-list selections report distribution keys
    pub distribution_key: bool,
    pub fields: &'static [FieldType],
    accessor: FieldAccessor,
}

impl fmt::Debug for KindCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindCapabilities")
            .field("kind", &self.kind)
            .field("criteria", &self.criteria)
            .field("distribution_key", &self.distribution_key)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl KindCapabilities {
    pub fn new(kind: EquipmentKind, fields: &'static [FieldType], accessor: FieldAccessor) -> Self {
        Self {
            kind,
            criteria: true,
            distribution_key: false,
            fields,
            accessor,
        }
    }

    pub fn without_criteria(mut self) -> Self {
        self.criteria = false;
        self
    }

    pub fn with_distribution_key(mut self) -> Self {
        self.distribution_key = true;
        self
    }

    pub fn supports_field(&self, field: FieldType) -> bool {
        self.fields.contains(&field)
    }

    /// Read `field` from `eq`, failing when the kind does not support it.
    pub fn field_value(
        &self,
        field: FieldType,
        eq: &Identifiable<'_>,
    ) -> FilterResult<Option<FieldValue>> {
        if !self.supports_field(field) {
            return Err(FilterError::UnsupportedField {
                field,
                kind: self.kind,
            });
        }
        Ok((self.accessor)(field, eq))
    }
}

/// Capability records keyed by kind.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    kinds: HashMap<EquipmentKind, KindCapabilities>,
}

impl KindRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared registry holding every kind the network model knows.
    pub fn global() -> &'static KindRegistry {
        &DEFAULT_REGISTRY
    }

    pub fn with_defaults() -> Self {
        use EquipmentKind::*;

        let mut registry = Self::new();
        registry.register(
            KindCapabilities::new(Generator, GENERATOR_FIELDS, field::generator_field)
                .with_distribution_key(),
        );
        registry.register(
            KindCapabilities::new(Load, LOAD_FIELDS, field::load_field).with_distribution_key(),
        );
        registry.register(KindCapabilities::new(Battery, BATTERY_FIELDS, field::battery_field));
        for kind in [
            StaticVarCompensator,
            ShuntCompensator,
            DanglingLine,
            LccConverterStation,
            VscConverterStation,
            BusbarSection,
        ] {
            registry.register(KindCapabilities::new(kind, LOCATED_FIELDS, field::located_field));
        }
        registry.register(
            KindCapabilities::new(Bus, LOCATED_FIELDS, field::located_field).without_criteria(),
        );
        for kind in [Line, TwoWindingsTransformer, ThreeWindingsTransformer] {
            registry.register(KindCapabilities::new(kind, IDENTITY_FIELDS, field::identity_field));
        }
        registry.register(KindCapabilities::new(HvdcLine, HVDC_FIELDS, field::hvdc_field));
        // voltage levels locate themselves; their substation gives the country
        registry.register(KindCapabilities::new(
            VoltageLevel,
            VOLTAGE_LEVEL_FIELDS,
            field::located_field,
        ));
        registry.register(KindCapabilities::new(
            Substation,
            SUBSTATION_FIELDS,
            field::substation_field,
        ));
        registry
    }

    /// Add or replace the record of a kind.
    pub fn register(&mut self, capabilities: KindCapabilities) {
        self.kinds.insert(capabilities.kind, capabilities);
    }

    pub fn remove(&mut self, kind: EquipmentKind) -> Option<KindCapabilities> {
        self.kinds.remove(&kind)
    }

    pub fn capabilities(&self, kind: EquipmentKind) -> FilterResult<&KindCapabilities> {
        self.kinds
            .get(&kind)
            .ok_or_else(|| FilterError::UnsupportedEquipmentKind(kind.to_string()))
    }

    pub fn supports(&self, kind: EquipmentKind) -> bool {
        self.kinds.contains_key(&kind)
    }

    /// Registered kinds in declaration order.
    pub fn kinds(&self) -> Vec<EquipmentKind> {
        EquipmentKind::ALL
            .into_iter()
            .filter(|kind| self.kinds.contains_key(kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_every_kind() {
        let registry = KindRegistry::global();
        assert_eq!(registry.kinds(), EquipmentKind::ALL.to_vec());
    }

    #[test]
    fn test_capability_flags() {
        let registry = KindRegistry::global();
        let generator = registry.capabilities(EquipmentKind::Generator).unwrap();
        assert!(generator.distribution_key);
        assert!(generator.supports_field(FieldType::EnergySource));

        let battery = registry.capabilities(EquipmentKind::Battery).unwrap();
        assert!(!battery.distribution_key);
        assert!(!battery.supports_field(FieldType::EnergySource));

        let bus = registry.capabilities(EquipmentKind::Bus).unwrap();
        assert!(!bus.criteria);
    }

    #[test]
    fn test_removed_kind_is_unsupported() {
        let mut registry = KindRegistry::with_defaults();
        registry.remove(EquipmentKind::HvdcLine);
        assert!(!registry.supports(EquipmentKind::HvdcLine));
        assert!(matches!(
            registry.capabilities(EquipmentKind::HvdcLine),
            Err(FilterError::UnsupportedEquipmentKind(kind)) if kind == "HVDC_LINE"
        ));
    }
}
