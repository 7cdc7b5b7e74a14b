//! Filter selection: which equipment of a network a filter selects.
//!
//! Candidates of the requested kind are enumerated in network order and each
//! is tested independently, so with the `parallel` feature the tests fan out
//! over the rayon pool. Results keep network order and carry no duplicates.

use std::collections::HashSet;

use gridsift_core::{EquipmentKind, Identifiable, Network};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::{EngineConfig, UnsupportedFilterPolicy};
use crate::error::{FilterError, FilterResult};
use crate::evaluator;
use crate::filter::{Filter, FilterEquipments, FilterId, IdentifiableAttributes};
use crate::registry::KindRegistry;
use crate::resolver::{EvaluationContext, FilterLoader, MembershipCache};
use crate::rule::ExpertRule;

/// Evaluates filters against networks.
///
/// Holds the filter source used for nested references, the capability
/// registry and the engine policies. Every call to [`FilterSelector::select`]
/// gets a fresh membership cache; use [`FilterSelector::select_with_cache`] to
/// share one across calls.
pub struct FilterSelector<'a> {
    loader: &'a dyn FilterLoader,
    registry: &'a KindRegistry,
    config: EngineConfig,
}

impl<'a> FilterSelector<'a> {
    pub fn new(loader: &'a dyn FilterLoader) -> Self {
        Self {
            loader,
            registry: KindRegistry::global(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_registry(mut self, registry: &'a KindRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &KindRegistry {
        self.registry
    }

    /// Equipment of `kind` selected by `filter`.
    pub fn select(
        &self,
        filter: &Filter,
        network: &Network,
        kind: EquipmentKind,
    ) -> FilterResult<Vec<IdentifiableAttributes>> {
        let cache = MembershipCache::new();
        self.select_with_cache(filter, network, kind, &cache)
    }

    /// Like [`select`](Self::select), resolving nested filters through a
    /// caller-owned cache.
    pub fn select_with_cache(
        &self,
        filter: &Filter,
        network: &Network,
        kind: EquipmentKind,
        cache: &MembershipCache,
    ) -> FilterResult<Vec<IdentifiableAttributes>> {
        let ctx = self.context(network, cache, kind);
        select_in(&ctx, filter, kind, self.config.parallel)
    }

    /// Select using the kind the filter declares.
    ///
    /// An identifier list without a kind selects every listed id present in
    /// the network, whatever its kind.
    pub fn select_filter(
        &self,
        filter: &Filter,
        network: &Network,
    ) -> FilterResult<Vec<IdentifiableAttributes>> {
        match (filter, filter.equipment_kind()) {
            (_, Some(kind)) => self.select(filter, network, kind),
            (Filter::IdentifierList(list), None) => {
                let mut seen = HashSet::new();
                Ok(list
                    .equipments
                    .iter()
                    .filter(|entry| seen.insert(entry.equipment_id.as_str()))
                    .filter_map(|entry| {
                        let eq = network.identifiable(entry.equipment_id.as_str())?;
                        let weighted = self
                            .registry
                            .capabilities(eq.kind())
                            .map_or(false, |c| c.distribution_key);
                        Some(attributes(&eq, entry.distribution_key.filter(|_| weighted)))
                    })
                    .collect())
            }
            (other, None) => Err(FilterError::UnsupportedEquipmentKind(format!(
                "unspecified ({} filter)",
                other.variant_name()
            ))),
        }
    }

    /// Selections of several stored filters, sharing one membership cache.
    ///
    /// Unknown ids are skipped. Identifier lists also report the listed ids
    /// the network does not hold.
    pub fn filter_equipments(
        &self,
        ids: &[FilterId],
        network: &Network,
    ) -> FilterResult<Vec<FilterEquipments>> {
        let cache = MembershipCache::new();
        let loaded = self.loader.load_filters(ids);
        let mut results = Vec::with_capacity(ids.len());

        for (id, filter) in ids.iter().zip(loaded) {
            let Some(filter) = filter else {
                debug!(filter = %id, "filter not found, skipping");
                continue;
            };
            let (identifiable_attributes, not_found_equipments) =
                match (&filter, filter.equipment_kind()) {
                    (Filter::IdentifierList(list), Some(kind)) => (
                        self.select_with_cache(&filter, network, kind, &cache)?,
                        list.not_found(network, kind),
                    ),
                    (Filter::IdentifierList(list), None) => {
                        let selected = self.select_filter(&filter, network)?;
                        let missing = list
                            .equipments
                            .iter()
                            .map(|entry| &entry.equipment_id)
                            .filter(|id| !network.contains(id.as_str()))
                            .cloned()
                            .collect();
                        (selected, missing)
                    }
                    (_, Some(kind)) => (
                        self.select_with_cache(&filter, network, kind, &cache)?,
                        Vec::new(),
                    ),
                    (_, None) => (self.select_filter(&filter, network)?, Vec::new()),
                };
            results.push(FilterEquipments {
                filter_id: *id,
                identifiable_attributes,
                not_found_equipments,
            });
        }
        Ok(results)
    }

    /// Evaluate a single rule against one equipment.
    pub fn evaluate(
        &self,
        rule: &ExpertRule,
        eq: &Identifiable<'_>,
        cache: &MembershipCache,
    ) -> FilterResult<bool> {
        let ctx = self.context(eq.network(), cache, eq.kind());
        evaluator::evaluate(rule, eq, &ctx)
    }

    fn context<'c>(
        &'c self,
        network: &'c Network,
        cache: &'c MembershipCache,
        kind: EquipmentKind,
    ) -> EvaluationContext<'c> {
        EvaluationContext::new(network, self.registry, &self.config, self.loader, cache, kind)
    }
}

fn attributes(eq: &Identifiable<'_>, distribution_key: Option<f64>) -> IdentifiableAttributes {
    IdentifiableAttributes {
        id: eq.id().clone(),
        kind: eq.kind(),
        distribution_key,
    }
}

fn unsupported(
    config: &EngineConfig,
    variant: &'static str,
    kind: EquipmentKind,
) -> FilterResult<Vec<IdentifiableAttributes>> {
    match config.unsupported_filter {
        UnsupportedFilterPolicy::Empty => {
            warn!(filter = variant, kind = %kind, "filter cannot select this kind, selecting nothing");
            Ok(Vec::new())
        }
        UnsupportedFilterPolicy::Error => Err(FilterError::UnsupportedFilter { variant, kind }),
    }
}

/// Core selection shared by top-level calls and nested resolution.
pub(crate) fn select_in(
    ctx: &EvaluationContext<'_>,
    filter: &Filter,
    kind: EquipmentKind,
    parallel: bool,
) -> FilterResult<Vec<IdentifiableAttributes>> {
    let capabilities = ctx.registry.capabilities(kind)?;

    let selected: Vec<IdentifiableAttributes> = match filter {
        Filter::Criteria(criteria)
            if capabilities.criteria && criteria.equipment_kind() == kind =>
        {
            let candidates = ctx.network.identifiables(kind);
            retain(candidates, parallel, |eq| Ok(criteria.matches(eq)))?
                .iter()
                .map(|eq| attributes(eq, None))
                .collect()
        }
        Filter::IdentifierList(list) if list.equipment_type.map_or(true, |t| t == kind) => {
            let keys = list.keys();
            ctx.network
                .identifiables(kind)
                .iter()
                .filter_map(|eq| {
                    let key = keys.get(eq.id().as_str())?;
                    let key = if capabilities.distribution_key { *key } else { None };
                    Some(attributes(eq, key))
                })
                .collect()
        }
        Filter::Expert(expert) if expert.equipment_type == kind => {
            expert.validate()?;
            let candidates = match kind {
                EquipmentKind::Bus => ctx.network.buses(expert.topology_kind),
                _ => ctx.network.identifiables(kind),
            };
            let parallel = parallel && prefetch(ctx, &expert.rules);
            retain(candidates, parallel, |eq| {
                evaluator::evaluate(&expert.rules, eq, ctx)
            })?
            .iter()
            .map(|eq| attributes(eq, None))
            .collect()
        }
        other => return unsupported(ctx.config, other.variant_name(), kind),
    };

    debug!(
        filter = filter.variant_name(),
        kind = %kind,
        selected = selected.len(),
        "filter evaluated"
    );
    Ok(selected)
}

/// Resolve every nested filter the rule references before fanning out, so
/// no worker waits on a membership another worker is still computing. On
/// failure the caller evaluates sequentially and the error surfaces at the
/// leaf that needs it.
fn prefetch(ctx: &EvaluationContext<'_>, rule: &ExpertRule) -> bool {
    rule.nested_filter_ids()
        .into_iter()
        .all(|id| ctx.membership(id).is_ok())
}

fn keep<'n, F>(eq: Identifiable<'n>, predicate: &F) -> Option<FilterResult<Identifiable<'n>>>
where
    F: Fn(&Identifiable<'n>) -> FilterResult<bool>,
{
    match predicate(&eq) {
        Ok(true) => Some(Ok(eq)),
        Ok(false) => None,
        Err(err) => Some(Err(err)),
    }
}

#[cfg(feature = "parallel")]
fn retain<'n, F>(
    candidates: Vec<Identifiable<'n>>,
    parallel: bool,
    predicate: F,
) -> FilterResult<Vec<Identifiable<'n>>>
where
    F: Fn(&Identifiable<'n>) -> FilterResult<bool> + Sync + Send,
{
    if parallel {
        candidates
            .into_par_iter()
            .filter_map(|eq| keep(eq, &predicate))
            .collect()
    } else {
        candidates
            .into_iter()
            .filter_map(|eq| keep(eq, &predicate))
            .collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn retain<'n, F>(
    candidates: Vec<Identifiable<'n>>,
    _parallel: bool,
    predicate: F,
) -> FilterResult<Vec<Identifiable<'n>>>
where
    F: Fn(&Identifiable<'n>) -> FilterResult<bool>,
{
    candidates
        .into_iter()
        .filter_map(|eq| keep(eq, &predicate))
        .collect()
}
