//! Building blocks shared by the criteria forms.
//!
//! Each predicate is vacuously true when its filter attribute is unset or
//! empty. The terminal combinators cover the three ways multi-terminal
//! equipment is matched: either assignment of two filters to two terminals,
//! any assignment of three filters to three legs, and "any terminal".

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use glob::Pattern;
use gridsift_core::{Properties, Substation, Terminal};
use serde::{Deserialize, Serialize};

use crate::numeric::{self, NumericFilter};

/// Allowed values per property key.
pub type FreeProperties = BTreeMap<String, BTreeSet<String>>;

/// Case-sensitive wildcard pattern matched against ids and names.
///
/// `*` matches any run of characters and `?` a single one. Brackets are
/// literal. Compiled once when the filter is built or deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NamePattern {
    raw: String,
    compiled: Option<Pattern>,
}

impl NamePattern {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let compiled = Pattern::new(&escape_glob(&raw)).ok();
        Self { raw, compiled }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, value: &str) -> bool {
        match &self.compiled {
            Some(pattern) => pattern.matches(value),
            None => self.raw == value,
        }
    }
}

/// Brackets become one-character classes and runs of `*` collapse, leaving
/// `*` and `?` as the only wildcards.
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    let mut previous = None;
    for c in raw.chars() {
        match c {
            '[' => escaped.push_str("[[]"),
            ']' => escaped.push_str("[]]"),
            '*' if previous == Some('*') => {}
            _ => escaped.push(c),
        }
        previous = Some(c);
    }
    escaped
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl From<String> for NamePattern {
    fn from(raw: String) -> Self {
        NamePattern::new(raw)
    }
}

impl From<&str> for NamePattern {
    fn from(raw: &str) -> Self {
        NamePattern::new(raw)
    }
}

impl From<NamePattern> for String {
    fn from(pattern: NamePattern) -> Self {
        pattern.raw
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

pub fn pattern_matches(pattern: Option<&NamePattern>, value: &str) -> bool {
    pattern.map_or(true, |p| p.matches(value))
}

pub fn country_matches(countries: &BTreeSet<String>, country: Option<&str>) -> bool {
    countries.is_empty() || country.map_or(false, |c| countries.contains(c))
}

/// Every filtered key must be present with one of its allowed values. A
/// missing property holder only matches an empty filter.
pub fn free_properties_match(filter: &FreeProperties, properties: Option<&Properties>) -> bool {
    if filter.is_empty() {
        return true;
    }
    let Some(properties) = properties else {
        return false;
    };
    filter.iter().all(|(key, allowed)| {
        properties
            .get(key)
            .map_or(false, |value| allowed.contains(value))
    })
}

/// Exact match against the substation's name, or its id when unnamed.
/// Equipment outside any substation passes.
pub fn substation_name_matches(name: Option<&str>, substation: Option<&Substation>) -> bool {
    match (name, substation) {
        (None, _) | (Some(_), None) => true,
        (Some(name), Some(s)) => s.name.as_deref().unwrap_or(s.id.as_str()) == name,
    }
}

pub fn terminal_voltage_matches(filter: Option<&NumericFilter>, terminal: &Terminal<'_>) -> bool {
    numeric::matches_optional(filter, Some(terminal.nominal_v().value()))
}

pub fn terminal_country_matches(countries: &BTreeSet<String>, terminal: &Terminal<'_>) -> bool {
    country_matches(countries, terminal.country())
}

/// Substation properties seen through a terminal.
pub fn terminal_properties_match(filter: &FreeProperties, terminal: &Terminal<'_>) -> bool {
    free_properties_match(filter, terminal.substation.map(|s| &s.properties))
}

/// Filters (f1, f2) match terminals (t1, t2) in either assignment.
pub fn symmetric<T: Copy, F: Copy>(
    (t1, t2): (T, T),
    (f1, f2): (F, F),
    matches: impl Fn(T, F) -> bool,
) -> bool {
    (matches(t1, f1) && matches(t2, f2)) || (matches(t1, f2) && matches(t2, f1))
}

const PERMUTATIONS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// Some assignment of the three filters to the three legs matches.
pub fn any_permutation<T: Copy, F: Copy>(
    legs: [T; 3],
    filters: [F; 3],
    matches: impl Fn(T, F) -> bool,
) -> bool {
    PERMUTATIONS.iter().any(|order| {
        order
            .iter()
            .zip(filters)
            .all(|(&leg, filter)| matches(legs[leg], filter))
    })
}
