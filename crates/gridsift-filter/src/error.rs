//! Errors raised while selecting equipment.
//!
//! Every variant is a deterministic structural problem (a filter or rule that
//! cannot be evaluated against the requested kind). None are retried; the
//! first one aborts the whole selection.

use gridsift_core::EquipmentKind;
use thiserror::Error;

use crate::filter::FilterId;
use crate::rule::{DataType, FieldType, OperatorType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// No capability record for the requested kind
    #[error("equipment kind {0} is not supported")]
    UnsupportedEquipmentKind(String),

    /// The field accessor has no extraction for this (kind, field) pair
    #[error("field {field} is not supported with {kind} equipment")]
    UnsupportedField {
        field: FieldType,
        kind: EquipmentKind,
    },

    /// Operator not legal for the rule's data type
    #[error("{operator} operator not supported with {data_type} rule data type")]
    UnsupportedOperator {
        operator: OperatorType,
        data_type: DataType,
    },

    /// A FILTER_UUID rule references a filter the store does not know
    #[error("nested filter {0} not found")]
    MissingNestedFilter(FilterId),

    /// The filter variant cannot select equipment of the requested kind
    #[error("{variant} filter cannot select {kind} equipment")]
    UnsupportedFilter {
        variant: &'static str,
        kind: EquipmentKind,
    },

    /// Malformed rule tree (empty combinator, missing literal, ...)
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    #[error("filter {0} references itself through nested filters")]
    CyclicFilterReference(FilterId),
}

/// Convenience type alias for Results using FilterError.
pub type FilterResult<T> = Result<T, FilterError>;
