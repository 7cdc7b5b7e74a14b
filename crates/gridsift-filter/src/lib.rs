//! # gridsift-filter: equipment filter engine
//!
//! Evaluates stored filter definitions against a [`gridsift_core::Network`]
//! and returns the ids of the equipment they select.
//!
//! ## Filter variants
//!
//! - **Criteria**: a fixed attribute form per equipment kind (id/name
//!   globs, countries, nominal voltages, substation name and properties).
//!   Unset attributes place no constraint and multi-terminal equipment
//!   matches regardless of terminal order.
//! - **Identifier list**: explicit ids, with optional distribution keys that
//!   are reported for generators and loads.
//! - **Expert**: a rule tree of AND/OR combinators over typed field
//!   comparisons, including membership in other stored filters.
//! - **Script**: stored but never evaluated; handled by the unsupported
//!   filter policy of [`EngineConfig`].
//!
//! ## Quick Start
//!
//! ```rust
//! use gridsift_core::*;
//! use gridsift_filter::*;
//!
//! let mut network = Network::new();
//! network
//!     .add_node(Node::VoltageLevel(VoltageLevel {
//!         id: "VL1".into(),
//!         nominal_v: Kilovolts(225.0),
//!         ..VoltageLevel::default()
//!     }))
//!     .unwrap();
//! network.add_node(Node::Generator(Generator::new("GEN_1", "VL1"))).unwrap();
//! network.add_node(Node::Generator(Generator::new("GEN_2", "VL1"))).unwrap();
//!
//! let filter = Filter::from(ExpertFilter::new(
//!     EquipmentKind::Generator,
//!     ExpertRule::and(vec![ExpertRule::string(
//!         FieldType::Id,
//!         OperatorType::EndsWith,
//!         "_2",
//!     )]),
//! ));
//!
//! let store = InMemoryFilterStore::new();
//! let selector = FilterSelector::new(&store);
//! let selected = selector.select(&filter, &network, EquipmentKind::Generator).unwrap();
//! assert_eq!(selected.len(), 1);
//! assert_eq!(selected[0].id.as_str(), "GEN_2");
//! ```
//!
//! ## Modules
//!
//! - [`filter`] - stored filter definitions and selection records
//! - [`criteria`] - per-kind criteria forms and their predicates
//! - [`rule`] - expert rule trees
//! - [`evaluator`] - expert rule evaluation
//! - [`registry`] - per-kind capability records
//! - [`resolver`] - filter loading and nested membership caching
//! - [`selector`] - the selection entry point
//! - [`config`] - engine policies

pub mod config;
pub mod criteria;
pub mod error;
pub mod evaluator;
pub mod field;
pub mod filter;
pub mod numeric;
pub mod registry;
pub mod resolver;
pub mod rule;
pub mod selector;

pub use config::{EngineConfig, MissingFilterPolicy, UnsupportedFilterPolicy};
pub use criteria::{
    CriteriaFilter, EquipmentIdentity, FreeProperties, GeneratorFilter, HvdcLineFilter,
    InjectionFilter, LineFilter, NamePattern, SubstationFilter, ThreeWindingsTransformerFilter,
    TwoWindingsTransformerFilter, VoltageLevelFilter,
};
pub use error::{FilterError, FilterResult};
pub use field::FieldValue;
pub use filter::{
    ExpertFilter, Filter, FilterEquipments, FilterId, IdentifiableAttributes,
    IdentifierListEntry, IdentifierListFilter, ScriptFilter, StoredFilter,
};
pub use numeric::{NumericFilter, RangeType};
pub use registry::{KindCapabilities, KindRegistry};
pub use resolver::{EvaluationContext, FilterLoader, InMemoryFilterStore, Membership, MembershipCache};
pub use rule::{CombinatorType, DataType, ExpertRule, FieldType, OperatorType};
pub use selector::FilterSelector;
