//! Expert rule trees.
//!
//! A rule is either a combinator (`AND` / `OR` over child rules) or a leaf
//! comparing one field of the equipment against a literal. Leaves are tagged
//! by their data type, which decides the legal operators:
//!
//! | data type   | operators                                                   |
//! |-------------|-------------------------------------------------------------|
//! | STRING      | IS, CONTAINS, BEGINS_WITH, ENDS_WITH, EXISTS                |
//! | NUMBER      | (NOT_)EQUALS, GREATER(_OR_EQUALS), LOWER(_OR_EQUALS), BETWEEN, (NOT_)IN, EXISTS |
//! | BOOLEAN     | EQUALS, NOT_EQUALS, EXISTS                                  |
//! | ENUM        | EQUALS, NOT_EQUALS, IN, NOT_IN, EXISTS                      |
//! | FILTER_UUID | IN, NOT_IN, EXISTS                                          |

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, FilterResult};
use crate::filter::FilterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombinatorType {
    And,
    Or,
}

impl CombinatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CombinatorType::And => "AND",
            CombinatorType::Or => "OR",
        }
    }
}

impl fmt::Display for CombinatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equipment attribute a leaf reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Id,
    Name,
    NominalVoltage,
    MinP,
    MaxP,
    TargetP,
    TargetV,
    TargetQ,
    EnergySource,
    Country,
    VoltageRegulatorOn,
    PlannedActivePowerSetPoint,
    VoltageLevelId,
    SubstationId,
    P0,
    Q0,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Id => "ID",
            FieldType::Name => "NAME",
            FieldType::NominalVoltage => "NOMINAL_VOLTAGE",
            FieldType::MinP => "MIN_P",
            FieldType::MaxP => "MAX_P",
            FieldType::TargetP => "TARGET_P",
            FieldType::TargetV => "TARGET_V",
            FieldType::TargetQ => "TARGET_Q",
            FieldType::EnergySource => "ENERGY_SOURCE",
            FieldType::Country => "COUNTRY",
            FieldType::VoltageRegulatorOn => "VOLTAGE_REGULATOR_ON",
            FieldType::PlannedActivePowerSetPoint => "PLANNED_ACTIVE_POWER_SET_POINT",
            FieldType::VoltageLevelId => "VOLTAGE_LEVEL_ID",
            FieldType::SubstationId => "SUBSTATION_ID",
            FieldType::P0 => "P0",
            FieldType::Q0 => "Q0",
        }
    }

    fn id() -> Self {
        FieldType::Id
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorType {
    Equals,
    NotEquals,
    In,
    NotIn,
    Exists,
    Lower,
    LowerOrEquals,
    Greater,
    GreaterOrEquals,
    Between,
    Is,
    Contains,
    BeginsWith,
    EndsWith,
}

impl OperatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorType::Equals => "EQUALS",
            OperatorType::NotEquals => "NOT_EQUALS",
            OperatorType::In => "IN",
            OperatorType::NotIn => "NOT_IN",
            OperatorType::Exists => "EXISTS",
            OperatorType::Lower => "LOWER",
            OperatorType::LowerOrEquals => "LOWER_OR_EQUALS",
            OperatorType::Greater => "GREATER",
            OperatorType::GreaterOrEquals => "GREATER_OR_EQUALS",
            OperatorType::Between => "BETWEEN",
            OperatorType::Is => "IS",
            OperatorType::Contains => "CONTAINS",
            OperatorType::BeginsWith => "BEGINS_WITH",
            OperatorType::EndsWith => "ENDS_WITH",
        }
    }

    /// Operators that hold when the field has no value.
    pub fn is_negation(&self) -> bool {
        matches!(self, OperatorType::NotEquals | OperatorType::NotIn)
    }
}

impl fmt::Display for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Enum,
    Combinator,
    FilterUuid,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "STRING",
            DataType::Number => "NUMBER",
            DataType::Boolean => "BOOLEAN",
            DataType::Enum => "ENUM",
            DataType::Combinator => "COMBINATOR",
            DataType::FilterUuid => "FILTER_UUID",
        }
    }

    /// Whether `operator` is legal on leaves of this data type.
    pub fn supports(&self, operator: OperatorType) -> bool {
        use OperatorType::*;
        match self {
            DataType::String => matches!(operator, Is | Contains | BeginsWith | EndsWith | Exists),
            DataType::Number => matches!(
                operator,
                Equals
                    | NotEquals
                    | GreaterOrEquals
                    | Greater
                    | LowerOrEquals
                    | Lower
                    | Between
                    | In
                    | NotIn
                    | Exists
            ),
            DataType::Boolean => matches!(operator, Equals | NotEquals | Exists),
            DataType::Enum => matches!(operator, Equals | NotEquals | In | NotIn | Exists),
            DataType::FilterUuid => matches!(operator, In | NotIn | Exists),
            DataType::Combinator => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinatorRule {
    pub combinator: CombinatorType,
    #[serde(default)]
    pub rules: Vec<ExpertRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringRule {
    pub field: FieldType,
    pub operator: OperatorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberRule {
    pub field: FieldType,
    pub operator: OperatorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Bounds for BETWEEN, candidates for IN / NOT_IN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanRule {
    pub field: FieldType,
    pub operator: OperatorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumRule {
    pub field: FieldType,
    pub operator: OperatorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<BTreeSet<String>>,
}

/// Membership of the field value in the equipment selected by other stored
/// filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterUuidRule {
    #[serde(default = "FieldType::id")]
    pub field: FieldType,
    pub operator: OperatorType,
    #[serde(default)]
    pub values: BTreeSet<FilterId>,
}

/// A node of an expert rule tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dataType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpertRule {
    Combinator(CombinatorRule),
    String(StringRule),
    Number(NumberRule),
    Boolean(BooleanRule),
    Enum(EnumRule),
    FilterUuid(FilterUuidRule),
}

impl ExpertRule {
    pub fn and(rules: Vec<ExpertRule>) -> Self {
        ExpertRule::Combinator(CombinatorRule {
            combinator: CombinatorType::And,
            rules,
        })
    }

    pub fn or(rules: Vec<ExpertRule>) -> Self {
        ExpertRule::Combinator(CombinatorRule {
            combinator: CombinatorType::Or,
            rules,
        })
    }

    pub fn string(field: FieldType, operator: OperatorType, value: impl Into<String>) -> Self {
        ExpertRule::String(StringRule {
            field,
            operator,
            value: Some(value.into()),
        })
    }

    pub fn number(field: FieldType, operator: OperatorType, value: f64) -> Self {
        ExpertRule::Number(NumberRule {
            field,
            operator,
            value: Some(value),
            values: None,
        })
    }

    pub fn numbers(field: FieldType, operator: OperatorType, values: Vec<f64>) -> Self {
        ExpertRule::Number(NumberRule {
            field,
            operator,
            value: None,
            values: Some(values),
        })
    }

    pub fn boolean(field: FieldType, operator: OperatorType, value: bool) -> Self {
        ExpertRule::Boolean(BooleanRule {
            field,
            operator,
            value: Some(value),
        })
    }

    pub fn enumeration(field: FieldType, operator: OperatorType, value: impl Into<String>) -> Self {
        ExpertRule::Enum(EnumRule {
            field,
            operator,
            value: Some(value.into()),
            values: None,
        })
    }

    pub fn enumerations<I, S>(field: FieldType, operator: OperatorType, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExpertRule::Enum(EnumRule {
            field,
            operator,
            value: None,
            values: Some(values.into_iter().map(Into::into).collect()),
        })
    }

    pub fn filters(
        field: FieldType,
        operator: OperatorType,
        ids: impl IntoIterator<Item = FilterId>,
    ) -> Self {
        ExpertRule::FilterUuid(FilterUuidRule {
            field,
            operator,
            values: ids.into_iter().collect(),
        })
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ExpertRule::Combinator(_) => DataType::Combinator,
            ExpertRule::String(_) => DataType::String,
            ExpertRule::Number(_) => DataType::Number,
            ExpertRule::Boolean(_) => DataType::Boolean,
            ExpertRule::Enum(_) => DataType::Enum,
            ExpertRule::FilterUuid(_) => DataType::FilterUuid,
        }
    }

    /// Field read by a leaf; `None` for combinators.
    pub fn field(&self) -> Option<FieldType> {
        match self {
            ExpertRule::Combinator(_) => None,
            ExpertRule::String(r) => Some(r.field),
            ExpertRule::Number(r) => Some(r.field),
            ExpertRule::Boolean(r) => Some(r.field),
            ExpertRule::Enum(r) => Some(r.field),
            ExpertRule::FilterUuid(r) => Some(r.field),
        }
    }

    pub fn operator(&self) -> Option<OperatorType> {
        match self {
            ExpertRule::Combinator(_) => None,
            ExpertRule::String(r) => Some(r.operator),
            ExpertRule::Number(r) => Some(r.operator),
            ExpertRule::Boolean(r) => Some(r.operator),
            ExpertRule::Enum(r) => Some(r.operator),
            ExpertRule::FilterUuid(r) => Some(r.operator),
        }
    }

    /// Children of a combinator; empty for leaves.
    pub fn rules(&self) -> &[ExpertRule] {
        match self {
            ExpertRule::Combinator(c) => &c.rules,
            _ => &[],
        }
    }

    /// Literal of a leaf rendered as text; multi-valued literals are joined
    /// with commas.
    pub fn string_value(&self) -> Option<String> {
        match self {
            ExpertRule::Combinator(_) => None,
            ExpertRule::String(r) => r.value.clone(),
            ExpertRule::Number(r) => match (&r.value, &r.values) {
                (Some(value), _) => Some(value.to_string()),
                (None, Some(values)) => Some(join(values.iter())),
                (None, None) => None,
            },
            ExpertRule::Boolean(r) => r.value.map(|v| v.to_string()),
            ExpertRule::Enum(r) => match (&r.value, &r.values) {
                (Some(value), _) => Some(value.clone()),
                (None, Some(values)) => Some(join(values.iter())),
                (None, None) => None,
            },
            ExpertRule::FilterUuid(r) if r.values.is_empty() => None,
            ExpertRule::FilterUuid(r) => Some(join(r.values.iter())),
        }
    }

    /// Every filter referenced by FILTER_UUID leaves in this tree.
    pub fn nested_filter_ids(&self) -> BTreeSet<FilterId> {
        let mut ids = BTreeSet::new();
        self.collect_filter_ids(&mut ids);
        ids
    }

    fn collect_filter_ids(&self, ids: &mut BTreeSet<FilterId>) {
        match self {
            ExpertRule::Combinator(c) => c.rules.iter().for_each(|r| r.collect_filter_ids(ids)),
            ExpertRule::FilterUuid(r) => ids.extend(r.values.iter().copied()),
            _ => {}
        }
    }

    /// Structural checks: non-empty combinators, legal operators, and a
    /// literal of the right shape for every non-EXISTS leaf.
    pub fn validate(&self) -> FilterResult<()> {
        if let ExpertRule::Combinator(c) = self {
            if c.rules.is_empty() {
                return Err(FilterError::InvalidRule(format!(
                    "{} combinator has no rules",
                    c.combinator
                )));
            }
            return c.rules.iter().try_for_each(ExpertRule::validate);
        }

        let data_type = self.data_type();
        let (field, operator) = match (self.field(), self.operator()) {
            (Some(field), Some(operator)) => (field, operator),
            _ => return Ok(()),
        };
        if !data_type.supports(operator) {
            return Err(FilterError::UnsupportedOperator {
                operator,
                data_type,
            });
        }
        if operator == OperatorType::Exists {
            return Ok(());
        }

        let missing = |what: &str| -> FilterResult<()> {
            Err(FilterError::InvalidRule(format!(
                "{} {} rule on {} needs {}",
                data_type, operator, field, what
            )))
        };
        match self {
            ExpertRule::String(r) if r.value.is_none() => missing("a value"),
            ExpertRule::Boolean(r) if r.value.is_none() => missing("a value"),
            ExpertRule::Number(r) => match operator {
                OperatorType::Between
                    if r.values.as_ref().map_or(true, |v| v.len() != 2) =>
                {
                    missing("exactly two values")
                }
                OperatorType::In | OperatorType::NotIn if r.values.is_none() => {
                    missing("a list of values")
                }
                OperatorType::Between | OperatorType::In | OperatorType::NotIn => Ok(()),
                _ if r.value.is_none() => missing("a value"),
                _ => Ok(()),
            },
            ExpertRule::Enum(r) => match operator {
                OperatorType::In | OperatorType::NotIn if r.values.is_none() => {
                    missing("a list of values")
                }
                OperatorType::Equals | OperatorType::NotEquals if r.value.is_none() => {
                    missing("a value")
                }
                _ => Ok(()),
            },
            ExpertRule::FilterUuid(r) if r.values.is_empty() => missing("at least one filter"),
            _ => Ok(()),
        }
    }

    /// Indented, one node per line rendering of the tree.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match self {
            ExpertRule::Combinator(c) => {
                out.push_str(&format!("{}{}\n", indent, c.combinator));
                for rule in &c.rules {
                    rule.write_tree(out, depth + 1);
                }
            }
            leaf => {
                let field = leaf.field().map(|f| f.as_str()).unwrap_or_default();
                let operator = leaf.operator().map(|o| o.as_str()).unwrap_or_default();
                match leaf.string_value() {
                    Some(value) => out.push_str(&format!(
                        "{}{} {} {} ({})\n",
                        indent,
                        field,
                        operator,
                        value,
                        leaf.data_type()
                    )),
                    None => out.push_str(&format!(
                        "{}{} {} ({})\n",
                        indent,
                        field,
                        operator,
                        leaf.data_type()
                    )),
                }
            }
        }
    }
}

fn join<T: ToString>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}
