//! Nested filter resolution.
//!
//! FILTER_UUID leaves test membership in the selection of other stored
//! filters. Those filters come from a [`FilterLoader`] and their memberships
//! live in a [`MembershipCache`] scoped to one top-level selection (or to a
//! longer-lived caller scope), so each referenced filter is loaded and
//! evaluated at most once however many leaves or equipment consult it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use gridsift_core::{EquipmentId, EquipmentKind, Network};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::config::{EngineConfig, MissingFilterPolicy};
use crate::error::{FilterError, FilterResult};
use crate::filter::{Filter, FilterId, StoredFilter};
use crate::registry::KindRegistry;
use crate::selector;

/// Source of stored filter definitions.
pub trait FilterLoader: Send + Sync {
    /// Load filters by id. The result has one entry per requested id, in
    /// request order, `None` where the id is unknown.
    fn load_filters(&self, ids: &[FilterId]) -> Vec<Option<Filter>>;
}

impl<L: FilterLoader + ?Sized> FilterLoader for Arc<L> {
    fn load_filters(&self, ids: &[FilterId]) -> Vec<Option<Filter>> {
        (**self).load_filters(ids)
    }
}

/// Filter store held in memory. Counts `load_filters` calls.
#[derive(Debug, Default)]
pub struct InMemoryFilterStore {
    filters: HashMap<FilterId, Filter>,
    loads: AtomicUsize,
}

impl InMemoryFilterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: FilterId, filter: impl Into<Filter>) -> Option<Filter> {
        self.filters.insert(id, filter.into())
    }

    pub fn with_filter(mut self, id: FilterId, filter: impl Into<Filter>) -> Self {
        self.insert(id, filter);
        self
    }

    pub fn get(&self, id: &FilterId) -> Option<&Filter> {
        self.filters.get(id)
    }

    /// Stored ids, sorted.
    pub fn ids(&self) -> Vec<FilterId> {
        let mut ids: Vec<_> = self.filters.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl FromIterator<StoredFilter> for InMemoryFilterStore {
    fn from_iter<I: IntoIterator<Item = StoredFilter>>(iter: I) -> Self {
        let mut store = Self::new();
        for stored in iter {
            store.insert(stored.id, stored.filter);
        }
        store
    }
}

impl FilterLoader for InMemoryFilterStore {
    fn load_filters(&self, ids: &[FilterId]) -> Vec<Option<Filter>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        ids.iter().map(|id| self.filters.get(id).cloned()).collect()
    }
}

/// Ids selected by one nested filter.
pub type Membership = Arc<HashSet<EquipmentId>>;

/// Memberships resolved so far, keyed by filter id.
///
/// Concurrent lookups of the same id wait for a single resolution. A failed
/// resolution leaves the entry unset and lets a waiter retry. A lookup that
/// would wait on a thread which is itself waiting, directly or through other
/// threads, on the caller fails with [`FilterError::CyclicFilterReference`].
#[derive(Debug, Default)]
pub struct MembershipCache {
    state: Mutex<CacheState>,
    settled: Condvar,
    resolutions: AtomicUsize,
}

#[derive(Debug)]
enum Slot {
    Resolving(ThreadId),
    Ready(Membership),
}

#[derive(Debug, Default)]
struct CacheState {
    slots: HashMap<FilterId, Slot>,
    /// Filter each blocked thread is waiting on
    waiting: HashMap<ThreadId, FilterId>,
}

impl CacheState {
    /// Whether `owner` is blocked, through a chain of in-progress
    /// resolutions, on one that `thread` holds.
    fn waits_on(&self, owner: ThreadId, thread: ThreadId) -> bool {
        let mut current = owner;
        for _ in 0..=self.waiting.len() {
            let Some(id) = self.waiting.get(&current) else {
                return false;
            };
            match self.slots.get(id) {
                Some(Slot::Resolving(next)) if *next == thread => return true,
                Some(Slot::Resolving(next)) => current = *next,
                _ => return false,
            }
        }
        false
    }
}

/// Releases an unfinished claim, on error or unwind, and wakes the waiters.
struct Claim<'c> {
    cache: &'c MembershipCache,
    id: FilterId,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut state = self.cache.state.lock();
        if matches!(state.slots.get(&self.id), Some(Slot::Resolving(_))) {
            state.slots.remove(&self.id);
        }
        drop(state);
        self.cache.settled.notify_all();
    }
}

impl MembershipCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &FilterId) -> Option<Membership> {
        match self.state.lock().slots.get(id) {
            Some(Slot::Ready(membership)) => Some(membership.clone()),
            _ => None,
        }
    }

    pub(crate) fn get_or_resolve<F>(&self, id: FilterId, resolve: F) -> FilterResult<Membership>
    where
        F: FnOnce() -> FilterResult<Membership>,
    {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            let owner = match state.slots.get(&id) {
                Some(Slot::Ready(membership)) => return Ok(membership.clone()),
                Some(Slot::Resolving(owner)) => *owner,
                None => break,
            };
            if owner == me || state.waits_on(owner, me) {
                debug!(filter = %id, "membership wait would deadlock");
                return Err(FilterError::CyclicFilterReference(id));
            }
            state.waiting.insert(me, id);
            self.settled.wait(&mut state);
            state.waiting.remove(&me);
        }
        state.slots.insert(id, Slot::Resolving(me));
        drop(state);

        // the lock is released while resolving; resolution may recurse
        let claim = Claim { cache: self, id };
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        let result = resolve();
        if let Ok(membership) = &result {
            self.state
                .lock()
                .slots
                .insert(id, Slot::Ready(membership.clone()));
        }
        drop(claim);
        result
    }

    /// Number of resolutions started, successful or not.
    pub fn resolution_count(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Number of resolved memberships.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything one selection needs: the network, the capability table, the
/// policies, the filter source and the membership cache, plus the chain of
/// nested filters currently being resolved.
pub struct EvaluationContext<'a> {
    pub network: &'a Network,
    pub registry: &'a KindRegistry,
    pub config: &'a EngineConfig,
    loader: &'a dyn FilterLoader,
    cache: &'a MembershipCache,
    /// Kind of the filter being evaluated
    kind: EquipmentKind,
    ancestors: Vec<FilterId>,
}

impl<'a> EvaluationContext<'a> {
    pub(crate) fn new(
        network: &'a Network,
        registry: &'a KindRegistry,
        config: &'a EngineConfig,
        loader: &'a dyn FilterLoader,
        cache: &'a MembershipCache,
        kind: EquipmentKind,
    ) -> Self {
        Self {
            network,
            registry,
            config,
            loader,
            cache,
            kind,
            ancestors: Vec::new(),
        }
    }

    pub fn kind(&self) -> EquipmentKind {
        self.kind
    }

    /// Membership of a nested filter, resolved on first use.
    pub fn membership(&self, id: FilterId) -> FilterResult<Membership> {
        if self.ancestors.contains(&id) {
            return Err(FilterError::CyclicFilterReference(id));
        }
        self.cache.get_or_resolve(id, || self.resolve(id))
    }

    fn resolve(&self, id: FilterId) -> FilterResult<Membership> {
        let loaded = self.loader.load_filters(&[id]).into_iter().next().flatten();
        let Some(filter) = loaded else {
            return match self.config.missing_nested_filter {
                MissingFilterPolicy::Error => Err(FilterError::MissingNestedFilter(id)),
                MissingFilterPolicy::Empty => {
                    warn!(filter = %id, "nested filter not found, treating as empty");
                    Ok(Arc::new(HashSet::new()))
                }
            };
        };

        let ids: HashSet<EquipmentId> = match (&filter, filter.equipment_kind()) {
            (_, Some(kind)) => {
                let nested = self.nested(id, kind);
                // nested selections stay on the calling thread
                selector::select_in(&nested, &filter, kind, false)?
                    .into_iter()
                    .map(|attributes| attributes.id)
                    .collect()
            }
            (Filter::IdentifierList(list), None) => list
                .equipments
                .iter()
                .map(|entry| &entry.equipment_id)
                .filter(|id| self.network.contains(id.as_str()))
                .cloned()
                .collect(),
            (_, None) => {
                let nested = self.nested(id, self.kind);
                selector::select_in(&nested, &filter, self.kind, false)?
                    .into_iter()
                    .map(|attributes| attributes.id)
                    .collect()
            }
        };
        debug!(filter = %id, members = ids.len(), "nested filter resolved");
        Ok(Arc::new(ids))
    }

    fn nested(&self, id: FilterId, kind: EquipmentKind) -> EvaluationContext<'a> {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(id);
        EvaluationContext {
            network: self.network,
            registry: self.registry,
            config: self.config,
            loader: self.loader,
            cache: self.cache,
            kind,
            ancestors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::IdentifierListFilter;

    #[test]
    fn test_store_answers_in_request_order() {
        let known = FilterId::new_v4();
        let unknown = FilterId::new_v4();
        let store = InMemoryFilterStore::new()
            .with_filter(known, IdentifierListFilter::new(EquipmentKind::Load).with_id("l1"));

        let loaded = store.load_filters(&[unknown, known]);
        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].is_none());
        assert!(loaded[1].is_some());
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn test_cache_resolves_once() {
        let cache = MembershipCache::new();
        let id = FilterId::new_v4();
        for _ in 0..3 {
            let membership = cache
                .get_or_resolve(id, || Ok(Arc::new(HashSet::from([EquipmentId::from("g1")]))))
                .unwrap();
            assert!(membership.contains("g1"));
        }
        assert_eq!(cache.resolution_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_reentrant_resolution_is_cyclic() {
        let cache = MembershipCache::new();
        let id = FilterId::new_v4();
        let err = cache
            .get_or_resolve(id, || cache.get_or_resolve(id, || Ok(Arc::default())))
            .unwrap_err();
        assert_eq!(err, FilterError::CyclicFilterReference(id));
        assert!(cache.is_empty());
        assert_eq!(cache.resolution_count(), 1);
    }

    #[test]
    fn test_failed_resolution_is_not_cached() {
        let cache = MembershipCache::new();
        let id = FilterId::new_v4();
        let err = cache
            .get_or_resolve(id, || Err(FilterError::MissingNestedFilter(id)))
            .unwrap_err();
        assert_eq!(err, FilterError::MissingNestedFilter(id));
        assert!(cache.get(&id).is_none());
        assert!(cache.is_empty());
    }
}
