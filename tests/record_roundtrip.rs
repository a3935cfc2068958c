//! Round-trip and isolation tests over the public facade
//!
//! Exercises the record lifecycle end to end against the in-memory store:
//! save/load round trips for every supported kind (nested three levels deep),
//! partial-field isolation, missing sub-path defaults, and duplicate
//! independence.

use chrono::{TimeZone, Utc};
use docbind::{
    DocumentStore, Error, FieldType, FieldValue, MemoryStore, Record, RecordShape, SchemaRegistry,
    StoreContext,
};
use std::collections::BTreeMap;
use std::sync::Arc;

fn registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    registry
        .register_all([
            RecordShape::builder("customer")
                .field("name", FieldType::string())
                .field("age", FieldType::integer())
                .field("balance", FieldType::float())
                .field("active", FieldType::boolean())
                .field("avatar", FieldType::bytes())
                .field("signed_up", FieldType::timestamp())
                .field("nickname", FieldType::optional(FieldType::string()))
                .field("extra", FieldType::Opaque)
                .field("tags", FieldType::list(FieldType::string()))
                .field("metadata", FieldType::map(FieldType::string()))
                .field("profile", FieldType::record("profile"))
                .build(),
            RecordShape::builder("profile")
                .field("bio", FieldType::string())
                .field("home", FieldType::record("geo"))
                .build(),
            RecordShape::builder("geo")
                .field("lat", FieldType::float())
                .field("lng", FieldType::float())
                .build(),
        ])
        .unwrap();
    registry
}

fn ctx() -> StoreContext {
    StoreContext::new(Arc::new(MemoryStore::new()))
}

fn map_of(pairs: &[(&str, &str)]) -> FieldValue {
    FieldValue::Map(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
            .collect::<BTreeMap<_, _>>(),
    )
}

#[test]
fn round_trip_every_scalar_kind() {
    let registry = registry();
    let ctx = ctx();
    let signed_up = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();

    let mut customer = Record::create(&registry, "customer", &ctx).unwrap();
    customer
        .scalar_mut("name")
        .unwrap()
        .set(FieldValue::from("Alice"), None)
        .unwrap();
    customer
        .scalar_mut("age")
        .unwrap()
        .set(FieldValue::from(34i64), None)
        .unwrap();
    customer
        .scalar_mut("balance")
        .unwrap()
        .set(FieldValue::from(12.5), None)
        .unwrap();
    customer
        .scalar_mut("active")
        .unwrap()
        .set(FieldValue::from(true), None)
        .unwrap();
    customer
        .scalar_mut("avatar")
        .unwrap()
        .set(FieldValue::Bytes(vec![1, 2, 255]), None)
        .unwrap();
    customer
        .scalar_mut("signed_up")
        .unwrap()
        .set(FieldValue::Timestamp(signed_up), None)
        .unwrap();
    customer.save(None).unwrap();

    let loaded = Record::get(&registry, &ctx, &customer.external_key()).unwrap();
    assert_eq!(loaded.field("name").unwrap().detach(), FieldValue::from("Alice"));
    assert_eq!(loaded.field("age").unwrap().detach(), FieldValue::from(34i64));
    assert_eq!(loaded.field("balance").unwrap().detach(), FieldValue::from(12.5));
    assert_eq!(loaded.field("active").unwrap().detach(), FieldValue::from(true));
    assert_eq!(
        loaded.field("avatar").unwrap().detach(),
        FieldValue::Bytes(vec![1, 2, 255])
    );
    assert_eq!(
        loaded.field("signed_up").unwrap().detach(),
        FieldValue::Timestamp(signed_up)
    );
    // Untouched nullable field stays null
    assert!(loaded.field("nickname").unwrap().detach().is_null());
}

#[test]
fn round_trip_three_levels_deep() {
    let registry = registry();
    let ctx = ctx();

    let mut customer = Record::create(&registry, "customer", &ctx).unwrap();
    {
        let profile = customer.record_mut("profile").unwrap();
        profile
            .scalar_mut("bio")
            .unwrap()
            .set(FieldValue::from("likes maps"), None)
            .unwrap();
        let home = profile.record_mut("home").unwrap();
        home.scalar_mut("lat")
            .unwrap()
            .set(FieldValue::from(52.52), None)
            .unwrap();
        home.scalar_mut("lng")
            .unwrap()
            .set(FieldValue::from(13.405), None)
            .unwrap();
    }
    customer.save(None).unwrap();

    // The nested scalar landed at its own stable path
    assert_eq!(
        ctx.store()
            .get(
                &customer.external_key(),
                &"profile.home.lat".parse().unwrap()
            )
            .unwrap(),
        Some(serde_json::json!(52.52))
    );

    let mut loaded = Record::get(&registry, &ctx, &customer.external_key()).unwrap();
    let home = loaded
        .record_mut("profile")
        .unwrap()
        .record_mut("home")
        .unwrap();
    assert_eq!(home.field("lat").unwrap().detach(), FieldValue::from(52.52));
    assert_eq!(home.field("lng").unwrap().detach(), FieldValue::from(13.405));
}

#[test]
fn round_trip_containers_and_opaque() {
    let registry = registry();
    let ctx = ctx();

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Sidecar {
        attempts: u32,
        note: String,
    }

    let sidecar = Sidecar {
        attempts: 3,
        note: "keep".to_string(),
    };

    let mut customer = Record::create(&registry, "customer", &ctx).unwrap();
    customer
        .list_mut("tags")
        .unwrap()
        .extend(vec![FieldValue::from("vip"), FieldValue::from("eu")], None)
        .unwrap();
    customer
        .map_mut("metadata")
        .unwrap()
        .set(map_of(&[("tier", "gold"), ("region", "eu")]), None)
        .unwrap();
    customer
        .scalar_mut("extra")
        .unwrap()
        .set(FieldValue::opaque_from(&sidecar).unwrap(), None)
        .unwrap();
    customer.save(None).unwrap();

    let loaded = Record::get(&registry, &ctx, &customer.external_key()).unwrap();
    assert_eq!(
        loaded.field("tags").unwrap().detach(),
        FieldValue::List(vec![FieldValue::from("vip"), FieldValue::from("eu")])
    );
    assert_eq!(
        loaded.field("metadata").unwrap().detach(),
        map_of(&[("region", "eu"), ("tier", "gold")])
    );
    let decoded: Sidecar = loaded
        .field("extra")
        .unwrap()
        .detach()
        .opaque_to()
        .unwrap()
        .unwrap();
    assert_eq!(decoded, sidecar);
}

#[test]
fn partial_field_writes_compose() {
    let registry = registry();
    let ctx = ctx();

    let mut customer = Record::create(&registry, "customer", &ctx).unwrap();
    customer.save(None).unwrap();
    let external = customer.external_key();

    // Two independent handles to the same document mutate different fields
    let mut writer_a = Record::get(&registry, &ctx, &external).unwrap();
    let mut writer_b = Record::get(&registry, &ctx, &external).unwrap();
    writer_a
        .list_mut("tags")
        .unwrap()
        .push(FieldValue::from("vip"), None)
        .unwrap();
    writer_b
        .map_mut("metadata")
        .unwrap()
        .set_item("tier", FieldValue::from("gold"), None)
        .unwrap();

    // Reloading shows both changes composed, neither overwrote the other
    let loaded = Record::get(&registry, &ctx, &external).unwrap();
    assert_eq!(
        loaded.field("tags").unwrap().detach(),
        FieldValue::List(vec![FieldValue::from("vip")])
    );
    assert_eq!(
        loaded.field("metadata").unwrap().detach(),
        map_of(&[("tier", "gold")])
    );
}

#[test]
fn missing_sub_path_resolves_to_empty_values() {
    let registry = registry();
    let ctx = ctx();

    // Document exists but holds none of the declared fields
    ctx.store()
        .set("customer:sparse", &docbind::DocPath::root(), serde_json::json!({}))
        .unwrap();

    let loaded = Record::get(&registry, &ctx, "customer:sparse").unwrap();
    assert_eq!(loaded.field("name").unwrap().detach(), FieldValue::from(""));
    assert_eq!(loaded.field("age").unwrap().detach(), FieldValue::from(0i64));
    assert_eq!(
        loaded.field("tags").unwrap().detach(),
        FieldValue::List(Vec::new())
    );
    assert_eq!(
        loaded.field("metadata").unwrap().detach(),
        FieldValue::Map(BTreeMap::new())
    );
    assert!(loaded.field("nickname").unwrap().detach().is_null());
}

#[test]
fn type_mismatch_is_rejected() {
    let registry = registry();
    let mut customer = Record::create(&registry, "customer", &ctx()).unwrap();
    let err = customer
        .scalar_mut("age")
        .unwrap()
        .set(FieldValue::from("not a number"), None)
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));

    let err = customer
        .list_mut("tags")
        .unwrap()
        .push(FieldValue::from(7i64), None)
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn duplicates_are_independent() {
    let registry = registry();
    let ctx = ctx();

    let mut original = Record::create(&registry, "customer", &ctx).unwrap();
    original
        .scalar_mut("name")
        .unwrap()
        .set(FieldValue::from("Alice"), None)
        .unwrap();
    original
        .list_mut("tags")
        .unwrap()
        .push(FieldValue::from("vip"), None)
        .unwrap();
    original.save(None).unwrap();

    let mut duplicate = original.duplicate().unwrap();
    assert_ne!(duplicate.external_key(), original.external_key());
    assert_eq!(
        duplicate.field("name").unwrap().detach(),
        FieldValue::from("Alice")
    );

    // Mutating the duplicate's containers leaves the original untouched
    duplicate
        .list_mut("tags")
        .unwrap()
        .push(FieldValue::from("copy"), None)
        .unwrap();
    duplicate
        .map_mut("metadata")
        .unwrap()
        .set_item("origin", FieldValue::from("dup"), None)
        .unwrap();

    let original_reloaded = Record::get(&registry, &ctx, &original.external_key()).unwrap();
    assert_eq!(
        original_reloaded.field("tags").unwrap().detach(),
        FieldValue::List(vec![FieldValue::from("vip")])
    );
    assert_eq!(
        original_reloaded.field("metadata").unwrap().detach(),
        FieldValue::Map(BTreeMap::new())
    );
}

#[test]
fn duplicate_many_generates_distinct_identities() {
    let registry = registry();
    let ctx = ctx();

    let mut original = Record::create(&registry, "customer", &ctx).unwrap();
    original
        .scalar_mut("name")
        .unwrap()
        .set(FieldValue::from("Alice"), None)
        .unwrap();
    original.save(None).unwrap();

    let copies = original.duplicate_many(3).unwrap();
    let mut keys: Vec<String> = copies.iter().map(Record::external_key).collect();
    keys.push(original.external_key());
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 4);
    for copy in &copies {
        assert!(Record::exists_key(&ctx, &copy.external_key()).unwrap());
    }
}

#[test]
fn delete_removes_the_document() {
    let registry = registry();
    let ctx = ctx();

    let mut customer = Record::create(&registry, "customer", &ctx).unwrap();
    customer.save(None).unwrap();
    assert!(customer.exists().unwrap());
    assert!(customer.delete().unwrap());
    assert!(!customer.exists().unwrap());
    assert!(matches!(
        Record::get(&registry, &ctx, &customer.external_key()),
        Err(Error::KeyNotFound(_))
    ));
}

#[test]
fn default_ttl_is_applied_on_save() {
    let registry = registry();
    let ctx = StoreContext::new(Arc::new(MemoryStore::new()))
        .with_default_ttl(std::time::Duration::from_millis(5));

    let mut customer = Record::create(&registry, "customer", &ctx).unwrap();
    customer.save(None).unwrap();
    assert!(customer.exists().unwrap());
    std::thread::sleep(std::time::Duration::from_millis(10));
    assert!(!customer.exists().unwrap());
}
