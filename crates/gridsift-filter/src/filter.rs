//! Stored filter definitions and the records a selection returns.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use gridsift_core::{EquipmentId, EquipmentKind, Network, TopologyKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::criteria::CriteriaFilter;
use crate::error::FilterResult;
use crate::rule::ExpertRule;

/// Identifier of a stored filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(Uuid);

impl FilterId {
    pub fn new_v4() -> Self {
        FilterId(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        FilterId(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for FilterId {
    type Err = uuid::Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(input.trim()).map(FilterId)
    }
}

/// A stored filter definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Filter {
    Criteria(CriteriaFilter),
    IdentifierList(IdentifierListFilter),
    Expert(ExpertFilter),
    /// Script filters are stored but cannot be evaluated here
    Script(ScriptFilter),
}

impl Filter {
    /// Kind the filter was written for, when it declares one.
    pub fn equipment_kind(&self) -> Option<EquipmentKind> {
        match self {
            Filter::Criteria(criteria) => Some(criteria.equipment_kind()),
            Filter::IdentifierList(list) => list.equipment_type,
            Filter::Expert(expert) => Some(expert.equipment_type),
            Filter::Script(script) => script.equipment_type,
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Filter::Criteria(_) => "CRITERIA",
            Filter::IdentifierList(_) => "IDENTIFIER_LIST",
            Filter::Expert(_) => "EXPERT",
            Filter::Script(_) => "SCRIPT",
        }
    }
}

impl From<CriteriaFilter> for Filter {
    fn from(filter: CriteriaFilter) -> Self {
        Filter::Criteria(filter)
    }
}

impl From<IdentifierListFilter> for Filter {
    fn from(filter: IdentifierListFilter) -> Self {
        Filter::IdentifierList(filter)
    }
}

impl From<ExpertFilter> for Filter {
    fn from(filter: ExpertFilter) -> Self {
        Filter::Expert(filter)
    }
}

/// One listed id with its optional distribution key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierListEntry {
    #[serde(rename = "equipmentID")]
    pub equipment_id: EquipmentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_key: Option<f64>,
}

/// A filter together with its id, as kept in a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFilter {
    pub id: FilterId,
    pub filter: Filter,
}

/// Explicit list of equipment ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierListFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_type: Option<EquipmentKind>,
    #[serde(default, rename = "filterEquipmentsAttributes")]
    pub equipments: Vec<IdentifierListEntry>,
}

impl IdentifierListFilter {
    pub fn new(equipment_type: EquipmentKind) -> Self {
        Self {
            equipment_type: Some(equipment_type),
            equipments: Vec::new(),
        }
    }

    pub fn with_id(self, id: impl Into<EquipmentId>) -> Self {
        self.with_entry(id, None)
    }

    pub fn with_entry(mut self, id: impl Into<EquipmentId>, distribution_key: Option<f64>) -> Self {
        self.equipments.push(IdentifierListEntry {
            equipment_id: id.into(),
            distribution_key,
        });
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.equipments.iter().any(|e| e.equipment_id.as_str() == id)
    }

    /// Listed ids mapped to their keys. The first occurrence of a repeated id
    /// wins.
    pub fn keys(&self) -> HashMap<&str, Option<f64>> {
        let mut keys = HashMap::with_capacity(self.equipments.len());
        for entry in &self.equipments {
            keys.entry(entry.equipment_id.as_str())
                .or_insert(entry.distribution_key);
        }
        keys
    }

    /// Listed ids with no equipment of `kind` in the network, in list order.
    pub fn not_found(&self, network: &Network, kind: EquipmentKind) -> Vec<EquipmentId> {
        self.equipments
            .iter()
            .map(|entry| &entry.equipment_id)
            .filter(|id| {
                network
                    .identifiable(id.as_str())
                    .map_or(true, |eq| eq.kind() != kind)
            })
            .cloned()
            .collect()
    }
}

/// Rule-tree filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertFilter {
    pub equipment_type: EquipmentKind,
    pub rules: ExpertRule,
    /// Restricts bus enumeration to voltage levels of this topology kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_kind: Option<TopologyKind>,
}

impl ExpertFilter {
    pub fn new(equipment_type: EquipmentKind, rules: ExpertRule) -> Self {
        Self {
            equipment_type,
            rules,
            topology_kind: None,
        }
    }

    pub fn with_topology_kind(mut self, topology_kind: TopologyKind) -> Self {
        self.topology_kind = Some(topology_kind);
        self
    }

    pub fn validate(&self) -> FilterResult<()> {
        self.rules.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_type: Option<EquipmentKind>,
    pub script: String,
}

/// One selected equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifiableAttributes {
    pub id: EquipmentId,
    #[serde(rename = "type")]
    pub kind: EquipmentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_key: Option<f64>,
}

/// Selection result of one stored filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterEquipments {
    pub filter_id: FilterId,
    pub identifiable_attributes: Vec<IdentifiableAttributes>,
    /// Listed ids absent from the network (identifier-list filters only)
    #[serde(default)]
    pub not_found_equipments: Vec<EquipmentId>,
}
