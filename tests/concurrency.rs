//! Concurrency tests: pipeline atomicity, lock mutual exclusion, atomic pops
//!
//! All suites run against the in-memory store; the lock tests drive real
//! threads through the public facade.

use docbind::{
    DocPath, DocumentStore, Error, FieldType, FieldValue, Lock, MemoryStore, PipelineOptions,
    Record, RecordShape, SchemaRegistry, StoreContext,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    registry
        .register(
            RecordShape::builder("customer")
                .field("name", FieldType::string())
                .field("age", FieldType::integer())
                .field("tags", FieldType::list(FieldType::string()))
                .field("metadata", FieldType::map(FieldType::string()))
                .build(),
        )
        .unwrap();
    registry
}

fn ctx() -> StoreContext {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    StoreContext::new(Arc::new(MemoryStore::new()))
}

fn path(s: &str) -> DocPath {
    s.parse().unwrap()
}

// =============================================================================
// Pipeline
// =============================================================================

#[test]
fn pipeline_defers_writes_until_scope_exit() {
    let registry = registry();
    let ctx = ctx();

    let mut customer = Record::create(&registry, "customer", &ctx).unwrap();
    customer
        .scalar_mut("name")
        .unwrap()
        .set(FieldValue::from("before"), None)
        .unwrap();
    customer.save(None).unwrap();
    let external = customer.external_key();

    customer
        .with_pipeline(PipelineOptions::default(), |record, batch| {
            record
                .scalar_mut("name")?
                .set(FieldValue::from("after"), Some(&mut *batch))?;
            record
                .scalar_mut("age")?
                .set(FieldValue::from(42i64), Some(&mut *batch))?;
            record
                .list_mut("tags")?
                .push(FieldValue::from("queued"), Some(&mut *batch))?;

            // A concurrent reader still observes the pre-scope state for
            // every queued path
            assert_eq!(
                ctx.store().get(&external, &path("name"))?,
                Some(serde_json::json!("before"))
            );
            assert_eq!(
                ctx.store().get(&external, &path("tags"))?,
                Some(serde_json::json!([]))
            );
            Ok(())
        })
        .unwrap();

    // After scope exit all queued writes are visible together
    assert_eq!(
        ctx.store().get(&external, &path("name")).unwrap(),
        Some(serde_json::json!("after"))
    );
    assert_eq!(
        ctx.store().get(&external, &path("age")).unwrap(),
        Some(serde_json::json!(42))
    );
    assert_eq!(
        ctx.store().get(&external, &path("tags")).unwrap(),
        Some(serde_json::json!(["queued"]))
    );
}

#[test]
fn pipeline_error_discards_the_batch() {
    let registry = registry();
    let ctx = ctx();

    let mut customer = Record::create(&registry, "customer", &ctx).unwrap();
    customer
        .scalar_mut("name")
        .unwrap()
        .set(FieldValue::from("kept"), None)
        .unwrap();
    customer.save(None).unwrap();
    let external = customer.external_key();

    let result: docbind::Result<()> =
        customer.with_pipeline(PipelineOptions::default(), |record, batch| {
            record
                .scalar_mut("name")?
                .set(FieldValue::from("dropped"), Some(&mut *batch))?;
            Err(Error::Usage("abort the scope".to_string()))
        });
    assert!(matches!(result, Err(Error::Usage(_))));

    assert_eq!(
        ctx.store().get(&external, &path("name")).unwrap(),
        Some(serde_json::json!("kept"))
    );
}

#[test]
fn pipeline_entry_snapshots_remote_state() {
    let registry = registry();
    let ctx = ctx();

    let mut customer = Record::create(&registry, "customer", &ctx).unwrap();
    customer
        .scalar_mut("age")
        .unwrap()
        .set(FieldValue::from(1i64), None)
        .unwrap();
    customer.save(None).unwrap();

    // Another writer bumps the field behind this record's back
    ctx.store()
        .set(&customer.external_key(), &path("age"), serde_json::json!(7))
        .unwrap();

    customer
        .with_pipeline(PipelineOptions::default(), |record, _batch| {
            // Entry snapshot refreshed the local cache
            assert_eq!(record.field("age")?.detach(), FieldValue::from(7i64));
            Ok(())
        })
        .unwrap();
}

#[test]
fn pipeline_on_missing_record_honors_ignore_if_deleted() {
    let registry = registry();
    let ctx = ctx();

    let mut customer = Record::create(&registry, "customer", &ctx).unwrap();
    let result = customer.with_pipeline(PipelineOptions::default(), |_, _| Ok(()));
    assert!(matches!(result, Err(Error::KeyNotFound(_))));

    let options = PipelineOptions {
        ignore_if_deleted: true,
    };
    customer
        .with_pipeline(options, |record, batch| {
            record
                .scalar_mut("name")?
                .set(FieldValue::from("fresh"), Some(&mut *batch))?;
            Ok(())
        })
        .unwrap();
    assert_eq!(
        ctx.store()
            .get(&customer.external_key(), &path("name"))
            .unwrap(),
        Some(serde_json::json!("fresh"))
    );
}

// =============================================================================
// Lock
// =============================================================================

#[test]
fn lock_holders_never_overlap() {
    let ctx = ctx();
    let store = ctx.store().clone();
    let held = Arc::new(AtomicBool::new(false));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        let held = Arc::clone(&held);
        handles.push(std::thread::spawn(move || {
            for _ in 0..5 {
                let lock = Lock::acquire(
                    store.clone(),
                    "shared-resource",
                    Duration::from_secs(30),
                    Duration::from_millis(1),
                )
                .unwrap();
                assert!(
                    !held.swap(true, Ordering::SeqCst),
                    "two holders reported acquired concurrently"
                );
                std::thread::sleep(Duration::from_millis(1));
                held.store(false, Ordering::SeqCst);
                lock.release().unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn second_acquisition_happens_after_first_release() {
    let ctx = ctx();
    let store = ctx.store().clone();

    let first = Lock::acquire(
        store.clone(),
        "ordered",
        Duration::from_secs(30),
        Duration::from_millis(1),
    )
    .unwrap();

    let contender = {
        let store = store.clone();
        std::thread::spawn(move || {
            let lock = Lock::acquire(
                store,
                "ordered",
                Duration::from_secs(30),
                Duration::from_millis(1),
            )
            .unwrap();
            let acquired_at = Instant::now();
            lock.release().unwrap();
            acquired_at
        })
    };

    std::thread::sleep(Duration::from_millis(10));
    let released_at = Instant::now();
    first.release().unwrap();

    let acquired_at = contender.join().unwrap();
    assert!(acquired_at >= released_at);
}

// =============================================================================
// Atomic pops
// =============================================================================

fn seeded_customer(registry: &SchemaRegistry, ctx: &StoreContext) -> Record {
    let mut customer = Record::create(registry, "customer", ctx).unwrap();
    let mut metadata = BTreeMap::new();
    metadata.insert("k".to_string(), FieldValue::from("v"));
    metadata.insert("k2".to_string(), FieldValue::from("v2"));
    customer
        .map_mut("metadata")
        .unwrap()
        .set(FieldValue::Map(metadata), None)
        .unwrap();
    customer.save(None).unwrap();
    customer
}

#[test]
fn map_pop_removes_remotely_and_locally() {
    let registry = registry();
    let ctx = ctx();
    let mut customer = seeded_customer(&registry, &ctx);
    let external = customer.external_key();

    let map = customer.map_mut("metadata").unwrap();
    let popped = map.pop("k", None).unwrap();
    assert_eq!(popped, FieldValue::from("v"));

    // Local cache and remote state agree without a re-load
    assert!(!map.contains_key("k"));
    assert!(map.contains_key("k2"));
    assert_eq!(
        ctx.store().get(&external, &path("metadata")).unwrap(),
        Some(serde_json::json!({"k2": "v2"}))
    );
}

#[test]
fn map_pop_missing_uses_default_without_mutating() {
    let registry = registry();
    let ctx = ctx();
    let mut customer = seeded_customer(&registry, &ctx);
    let external = customer.external_key();

    let map = customer.map_mut("metadata").unwrap();
    let popped = map.pop("missing", Some(FieldValue::from(42i64))).unwrap();
    assert_eq!(popped, FieldValue::from(42i64));
    assert_eq!(
        ctx.store().get(&external, &path("metadata")).unwrap(),
        Some(serde_json::json!({"k": "v", "k2": "v2"}))
    );

    let err = map.pop("missing", None).unwrap_err();
    assert!(matches!(err, Error::KeyError(_)));
}

#[test]
fn map_pop_arbitrary_drains_then_raises() {
    let registry = registry();
    let ctx = ctx();
    let mut customer = seeded_customer(&registry, &ctx);

    let map = customer.map_mut("metadata").unwrap();
    let (first_key, _) = map.pop_arbitrary().unwrap();
    let (second_key, _) = map.pop_arbitrary().unwrap();
    let mut popped = [first_key.as_str(), second_key.as_str()];
    popped.sort_unstable();
    assert_eq!(popped, ["k", "k2"]);

    let err = map.pop_arbitrary().unwrap_err();
    match err {
        Error::KeyError(detail) => assert_eq!(detail, "dictionary is empty"),
        other => panic!("expected KeyError, got {}", other),
    }
}

#[test]
fn list_pop_syncs_cache_with_single_round_trip() {
    let registry = registry();
    let ctx = ctx();

    let mut customer = Record::create(&registry, "customer", &ctx).unwrap();
    customer
        .list_mut("tags")
        .unwrap()
        .extend(
            vec![
                FieldValue::from("a"),
                FieldValue::from("b"),
                FieldValue::from("c"),
            ],
            None,
        )
        .unwrap();
    customer.save(None).unwrap();
    let external = customer.external_key();

    let tags = customer.list_mut("tags").unwrap();
    assert_eq!(tags.pop(-1).unwrap(), FieldValue::from("c"));
    assert_eq!(tags.pop(0).unwrap(), FieldValue::from("a"));
    assert_eq!(tags.items(), [FieldValue::from("b")]);
    assert_eq!(
        ctx.store().get(&external, &path("tags")).unwrap(),
        Some(serde_json::json!(["b"]))
    );

    let err = tags.pop(9).unwrap_err();
    assert!(matches!(err, Error::KeyError(_)));
}

#[test]
fn clear_empties_container_remotely() {
    let registry = registry();
    let ctx = ctx();
    let mut customer = seeded_customer(&registry, &ctx);
    let external = customer.external_key();

    customer.map_mut("metadata").unwrap().clear(None).unwrap();
    assert_eq!(
        ctx.store().get(&external, &path("metadata")).unwrap(),
        Some(serde_json::json!({}))
    );
}
