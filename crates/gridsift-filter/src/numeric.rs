//! Numeric threshold filters used by criteria forms.
//!
//! Comparisons are exact: `EQUALITY` uses `==` on `f64` with no tolerance and
//! `RANGE` is inclusive at both bounds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangeType {
    Equality,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Range,
}

/// An operator with one threshold, or two for `RANGE`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericFilter {
    #[serde(rename = "type")]
    pub range_type: RangeType,
    pub value1: f64,
    /// Upper bound for `RANGE`; unused otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<f64>,
}

impl NumericFilter {
    fn single(range_type: RangeType, value: f64) -> Self {
        Self {
            range_type,
            value1: value,
            value2: None,
        }
    }

    pub fn equality(value: f64) -> Self {
        Self::single(RangeType::Equality, value)
    }

    pub fn greater_than(value: f64) -> Self {
        Self::single(RangeType::GreaterThan, value)
    }

    pub fn greater_or_equal(value: f64) -> Self {
        Self::single(RangeType::GreaterOrEqual, value)
    }

    pub fn less_than(value: f64) -> Self {
        Self::single(RangeType::LessThan, value)
    }

    pub fn less_or_equal(value: f64) -> Self {
        Self::single(RangeType::LessOrEqual, value)
    }

    pub fn range(min: f64, max: f64) -> Self {
        Self {
            range_type: RangeType::Range,
            value1: min,
            value2: Some(max),
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        match self.range_type {
            RangeType::Equality => value == self.value1,
            RangeType::GreaterThan => value > self.value1,
            RangeType::GreaterOrEqual => value >= self.value1,
            RangeType::LessThan => value < self.value1,
            RangeType::LessOrEqual => value <= self.value1,
            // a range without upper bound is open-ended
            RangeType::Range => {
                value >= self.value1 && self.value2.map_or(true, |max| value <= max)
            }
        }
    }
}

/// Unset filters match anything; a set filter never matches a missing value.
pub fn matches_optional(filter: Option<&NumericFilter>, value: Option<f64>) -> bool {
    match filter {
        None => true,
        Some(filter) => value.map_or(false, |v| filter.matches(v)),
    }
}
