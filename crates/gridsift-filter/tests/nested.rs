mod common;

use common::{expert, fixture_network, ids};
use gridsift_core::{EquipmentId, EquipmentKind};
use gridsift_filter::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

fn in_filter(field: FieldType, operator: OperatorType, id: FilterId) -> ExpertRule {
    ExpertRule::filters(field, operator, [id])
}

#[test]
fn nested_filter_is_loaded_and_resolved_once() {
    let network = fixture_network();
    let listed = FilterId::new_v4();
    let store = InMemoryFilterStore::new().with_filter(
        listed,
        IdentifierListFilter::new(EquipmentKind::Generator)
            .with_id("g1")
            .with_id("g2"),
    );
    let filter = Filter::from(ExpertFilter::new(
        EquipmentKind::Generator,
        ExpertRule::or(vec![
            ExpertRule::and(vec![
                in_filter(FieldType::Id, OperatorType::In, listed),
                ExpertRule::number(FieldType::MaxP, OperatorType::Greater, 500.0),
            ]),
            ExpertRule::and(vec![
                in_filter(FieldType::Id, OperatorType::In, listed),
                ExpertRule::enumeration(FieldType::EnergySource, OperatorType::Equals, "HYDRO"),
            ]),
        ]),
    ));

    let selector = FilterSelector::new(&store);
    let cache = MembershipCache::new();
    let selected = selector
        .select_with_cache(&filter, &network, EquipmentKind::Generator, &cache)
        .unwrap();
    assert_eq!(ids(&selected), vec!["g1", "g2"]);
    assert_eq!(store.load_count(), 1);
    assert_eq!(cache.resolution_count(), 1);

    // a second selection through the same cache loads nothing
    let again = selector
        .select_with_cache(&filter, &network, EquipmentKind::Generator, &cache)
        .unwrap();
    assert_eq!(again, selected);
    assert_eq!(store.load_count(), 1);
    assert_eq!(cache.resolution_count(), 1);
    assert!(cache.get(&listed).unwrap().contains("g2"));
}

#[test]
fn membership_uses_the_nested_filter_kind() {
    let network = fixture_network();
    let high_voltage = FilterId::new_v4();
    let store = InMemoryFilterStore::new().with_filter(
        high_voltage,
        CriteriaFilter::VoltageLevel(VoltageLevelFilter {
            nominal_voltage: Some(NumericFilter::greater_or_equal(225.0)),
            ..VoltageLevelFilter::default()
        }),
    );
    let selector = FilterSelector::new(&store);

    let inside = expert(
        EquipmentKind::Generator,
        in_filter(FieldType::VoltageLevelId, OperatorType::In, high_voltage),
    );
    let selected = selector
        .select(&inside, &network, EquipmentKind::Generator)
        .unwrap();
    assert_eq!(ids(&selected), vec!["g1", "g2"]);

    let outside = expert(
        EquipmentKind::Generator,
        in_filter(FieldType::VoltageLevelId, OperatorType::NotIn, high_voltage),
    );
    let selected = selector
        .select(&outside, &network, EquipmentKind::Generator)
        .unwrap();
    assert_eq!(ids(&selected), vec!["g3", "g4"]);
}

#[test]
fn nested_expert_filters_are_evaluated() {
    let network = fixture_network();
    let big = FilterId::new_v4();
    let store = InMemoryFilterStore::new().with_filter(
        big,
        ExpertFilter::new(
            EquipmentKind::Generator,
            ExpertRule::and(vec![ExpertRule::number(
                FieldType::MaxP,
                OperatorType::GreaterOrEquals,
                100.0,
            )]),
        ),
    );
    let filter = Filter::from(ExpertFilter::new(
        EquipmentKind::Generator,
        ExpertRule::and(vec![
            in_filter(FieldType::Id, OperatorType::In, big),
            ExpertRule::enumeration(FieldType::EnergySource, OperatorType::Equals, "nuclear"),
        ]),
    ));
    let selected = FilterSelector::new(&store)
        .select(&filter, &network, EquipmentKind::Generator)
        .unwrap();
    assert_eq!(ids(&selected), vec!["g1"]);
}

#[test]
fn untyped_identifier_list_selects_listed_ids() {
    let network = fixture_network();
    let listed = FilterId::new_v4();
    let store = InMemoryFilterStore::new().with_filter(
        listed,
        IdentifierListFilter {
            equipment_type: None,
            equipments: Vec::new(),
        }
        .with_id("g3")
        .with_id("ghost"),
    );
    let filter = expert(
        EquipmentKind::Generator,
        in_filter(FieldType::Id, OperatorType::In, listed),
    );
    let selected = FilterSelector::new(&store)
        .select(&filter, &network, EquipmentKind::Generator)
        .unwrap();
    assert_eq!(ids(&selected), vec!["g3"]);
}

#[test]
fn missing_nested_filter_follows_policy() {
    let network = fixture_network();
    let store = InMemoryFilterStore::new();
    let unknown = FilterId::new_v4();
    let inside = expert(
        EquipmentKind::Generator,
        in_filter(FieldType::Id, OperatorType::In, unknown),
    );
    let outside = expert(
        EquipmentKind::Generator,
        in_filter(FieldType::Id, OperatorType::NotIn, unknown),
    );

    let err = FilterSelector::new(&store)
        .select(&inside, &network, EquipmentKind::Generator)
        .unwrap_err();
    assert_eq!(err, FilterError::MissingNestedFilter(unknown));

    let lenient = FilterSelector::new(&store).with_config(EngineConfig {
        missing_nested_filter: MissingFilterPolicy::Empty,
        ..EngineConfig::default()
    });
    assert!(lenient
        .select(&inside, &network, EquipmentKind::Generator)
        .unwrap()
        .is_empty());
    assert_eq!(
        ids(&lenient
            .select(&outside, &network, EquipmentKind::Generator)
            .unwrap()),
        vec!["g1", "g2", "g3", "g4"]
    );
}

#[test]
fn cyclic_references_are_reported() {
    let network = fixture_network();
    let a = FilterId::new_v4();
    let b = FilterId::new_v4();
    let referencing = |id| {
        ExpertFilter::new(
            EquipmentKind::Generator,
            ExpertRule::and(vec![in_filter(FieldType::Id, OperatorType::In, id)]),
        )
    };
    let store = InMemoryFilterStore::new()
        .with_filter(a, referencing(b))
        .with_filter(b, referencing(a));

    for config in [EngineConfig::default(), EngineConfig::default().sequential()] {
        let top = Filter::from(referencing(b));
        let err = FilterSelector::new(&store)
            .with_config(config)
            .select(&top, &network, EquipmentKind::Generator)
            .unwrap_err();
        assert!(
            matches!(err, FilterError::CyclicFilterReference(id) if id == a || id == b),
            "{err}"
        );
    }
}

/// Store whose first two loads wait for each other.
struct GatedStore {
    inner: InMemoryFilterStore,
    gate: Barrier,
    loads: AtomicUsize,
}

impl FilterLoader for GatedStore {
    fn load_filters(&self, ids: &[FilterId]) -> Vec<Option<Filter>> {
        if self.loads.fetch_add(1, Ordering::SeqCst) < 2 {
            self.gate.wait();
        }
        self.inner.load_filters(ids)
    }
}

#[test]
fn cycle_across_threads_sharing_a_cache_fails_instead_of_blocking() {
    let network = Arc::new(fixture_network());
    let a = FilterId::new_v4();
    let b = FilterId::new_v4();
    let referencing = |id| {
        ExpertFilter::new(
            EquipmentKind::Generator,
            ExpertRule::and(vec![in_filter(FieldType::Id, OperatorType::In, id)]),
        )
    };
    let store = Arc::new(GatedStore {
        inner: InMemoryFilterStore::new()
            .with_filter(a, referencing(b))
            .with_filter(b, referencing(a)),
        gate: Barrier::new(2),
        loads: AtomicUsize::new(0),
    });
    let cache = Arc::new(MembershipCache::new());

    // each thread claims one filter, then needs the one the other holds
    let (tx, rx) = mpsc::channel();
    for target in [a, b] {
        let (network, store, cache, tx) =
            (network.clone(), store.clone(), cache.clone(), tx.clone());
        let top = Filter::from(referencing(target));
        thread::spawn(move || {
            let result = FilterSelector::new(&*store).select_with_cache(
                &top,
                &network,
                EquipmentKind::Generator,
                &cache,
            );
            let _ = tx.send(result);
        });
    }

    for _ in 0..2 {
        let result = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("selection blocked on a cyclic reference");
        let err = result.unwrap_err();
        assert!(
            matches!(err, FilterError::CyclicFilterReference(id) if id == a || id == b),
            "{err}"
        );
    }
    assert!(cache.is_empty());
}

#[test]
fn shared_cache_spans_a_batch_of_stored_filters() {
    let network = fixture_network();
    let listed = FilterId::new_v4();
    let first = FilterId::new_v4();
    let second = FilterId::new_v4();
    let store = InMemoryFilterStore::new()
        .with_filter(
            listed,
            IdentifierListFilter::new(EquipmentKind::Generator)
                .with_entry("g2", Some(4.0))
                .with_id("missing"),
        )
        .with_filter(
            first,
            ExpertFilter::new(
                EquipmentKind::Generator,
                ExpertRule::and(vec![in_filter(FieldType::Id, OperatorType::In, listed)]),
            ),
        )
        .with_filter(
            second,
            ExpertFilter::new(
                EquipmentKind::Generator,
                ExpertRule::and(vec![in_filter(FieldType::Id, OperatorType::NotIn, listed)]),
            ),
        );

    let unknown = FilterId::new_v4();
    let results = FilterSelector::new(&store)
        .filter_equipments(&[first, unknown, second, listed], &network)
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].filter_id, first);
    assert_eq!(ids(&results[0].identifiable_attributes), vec!["g2"]);
    assert_eq!(ids(&results[1].identifiable_attributes), vec!["g1", "g3", "g4"]);
    assert_eq!(results[2].filter_id, listed);
    assert_eq!(results[2].identifiable_attributes[0].distribution_key, Some(4.0));
    assert_eq!(results[2].not_found_equipments, vec![EquipmentId::from("missing")]);
    // one batch load plus a single nested resolution
    assert_eq!(store.load_count(), 2);
}
