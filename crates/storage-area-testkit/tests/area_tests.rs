//! Behavior of the storage area operations.

use proptest::prelude::*;
use storage_area::host::{Factory, HostError, TransactionMode};
use storage_area::{Key, StorageError, Value, SCHEMA_VERSION, STORE_NAME};
use storage_area_testkit::generators::{disallowed_key_value, key_value, storable_value};
use storage_area_testkit::{Fault, FaultyBackend, TestFixture};

fn is_injected<T>(result: &Result<T, StorageError>) -> bool {
    matches!(result, Err(StorageError::Host(HostError::Constraint(_))))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[tokio::test]
async fn alpha_scenario() {
    let fixture = TestFixture::memory();
    let area = fixture.area("alpha");

    area.set(1, "one").await.unwrap();
    area.set("a", [1, 2, 3]).await.unwrap();

    assert_eq!(area.get(1).await.unwrap(), Some(Value::from("one")));
    assert_eq!(area.get("a").await.unwrap(), Some(Value::array([1, 2, 3])));
    assert!(!area.has(2).await.unwrap());
    assert_eq!(area.keys().await.unwrap(), vec![Key::from(1), Key::from("a")]);

    area.delete(1).await.unwrap();
    assert_eq!(area.keys().await.unwrap(), vec![Key::from("a")]);

    area.clear().await.unwrap();
    assert!(area.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_absent_and_overwrite() {
    let fixture = TestFixture::memory();
    fixture
        .with_area(|area| async move {
            area.delete("never-set").await.unwrap();

            area.set("k", "first").await.unwrap();
            area.set("k", "second").await.unwrap();
            assert_eq!(area.get("k").await.unwrap(), Some(Value::from("second")));
            assert_eq!(area.keys().await.unwrap().len(), 1);
        })
        .await;
}

#[tokio::test]
async fn entries_pair_keys_with_values_in_key_order() {
    let fixture = TestFixture::memory();
    fixture
        .with_area(|area| async move {
            area.set(Value::array(["x"]), "array").await.unwrap();
            area.set(&b"\x01"[..], "binary").await.unwrap();
            area.set("s", "string").await.unwrap();
            area.set(Value::date(5.0), "date").await.unwrap();
            area.set(-3.5, "number").await.unwrap();

            let entries = area.entries().await.unwrap();
            let keys = area.keys().await.unwrap();
            let values = area.values().await.unwrap();

            assert_eq!(entries.len(), 5);
            assert_eq!(
                values,
                ["number", "date", "string", "binary", "array"]
                    .into_iter()
                    .map(Value::from)
                    .collect::<Vec<_>>()
            );
            for (i, (key, value)) in entries.into_iter().enumerate() {
                assert_eq!(key, keys[i]);
                assert_eq!(value, values[i]);
            }
        })
        .await;
}

#[tokio::test]
async fn concurrent_first_operations_share_one_open() {
    let fixture = TestFixture::memory();
    let area = fixture.area("concurrent");
    let other = area.clone();

    let (first, second, keys) = tokio::join!(area.get(1), other.get(2), area.keys());
    assert_eq!(first.unwrap(), None);
    assert_eq!(second.unwrap(), None);
    assert!(keys.unwrap().is_empty());

    let database = area.backing_store().database;
    assert_eq!(fixture.factory.open_connections(&database).unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_writes_all_land() {
    let fixture = TestFixture::memory();
    let area = fixture.area("writers");

    let writes: Vec<_> = (0..16)
        .map(|i| {
            let area = area.clone();
            tokio::spawn(async move { area.set(i, i * 10).await })
        })
        .collect();
    for write in writes {
        write.await.unwrap().unwrap();
    }

    let keys = area.keys().await.unwrap();
    assert_eq!(keys, (0..16).map(Key::from).collect::<Vec<_>>());
    assert_eq!(area.get(7).await.unwrap(), Some(Value::from(70)));
}

#[tokio::test]
async fn areas_with_different_names_are_isolated() {
    let fixture = TestFixture::memory();
    let a = fixture.area("a");
    let b = fixture.area("b");

    a.set("shared", 1).await.unwrap();
    b.set("shared", 2).await.unwrap();
    a.clear().await.unwrap();

    assert_eq!(a.get("shared").await.unwrap(), None);
    assert_eq!(b.get("shared").await.unwrap(), Some(Value::from(2)));
}

#[tokio::test]
async fn same_name_on_one_factory_shares_records() {
    let fixture = TestFixture::memory();
    let first = fixture.area("shared");
    let second = fixture.area("shared");

    first.set("k", "v").await.unwrap();
    assert_eq!(second.get("k").await.unwrap(), Some(Value::from("v")));
}

#[tokio::test]
async fn clear_on_unopened_area_succeeds() {
    let fixture = TestFixture::memory();
    let area = fixture.area("untouched");
    area.clear().await.unwrap();
    assert!(area.entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn entries_fail_when_values_request_fails() {
    let fixture = TestFixture::faulty(Fault::Values);
    let area = fixture.area("values-fault");
    area.set(1, "one").await.unwrap();

    assert!(is_injected(&area.entries().await));
    assert!(is_injected(&area.values().await));
    assert_eq!(area.keys().await.unwrap(), vec![Key::from(1)]);
}

#[tokio::test]
async fn entries_fail_when_keys_request_fails() {
    let fixture = TestFixture::faulty(Fault::Keys);
    let area = fixture.area("keys-fault");
    area.set(1, "one").await.unwrap();

    assert!(is_injected(&area.entries().await));
    assert!(is_injected(&area.keys().await));
    assert_eq!(area.values().await.unwrap(), vec![Value::from("one")]);
}

#[tokio::test]
async fn point_reads_surface_request_failures() {
    let fixture = TestFixture::faulty(Fault::Get);
    let area = fixture.area("get-fault");
    area.set("k", "v").await.unwrap();
    assert!(is_injected(&area.get("k").await));
    assert!(area.has("k").await.unwrap());

    let fixture = TestFixture::faulty(Fault::Count);
    let area = fixture.area("count-fault");
    area.set("k", "v").await.unwrap();
    assert!(is_injected(&area.has("k").await));
    assert_eq!(area.get("k").await.unwrap(), Some(Value::from("v")));
}

#[tokio::test]
async fn requests_after_a_failed_request_fail_with_it() {
    let factory = Factory::new(FaultyBackend::new(Fault::Keys));
    let db = factory
        .open("faulty", SCHEMA_VERSION, |upgrade| {
            upgrade.create_object_store(STORE_NAME)
        })
        .await
        .unwrap();

    let mut tx = db.transaction(STORE_NAME, TransactionMode::ReadOnly).unwrap();
    let mut store = tx.object_store(STORE_NAME).unwrap();
    let before = store.get(&Key::from(1));
    let failing = store.get_all_keys();
    let after = store.get_all();
    let completion = tx.commit();

    assert_eq!(before.await.unwrap(), None);
    assert!(matches!(failing.await, Err(HostError::Constraint(_))));
    assert!(matches!(after.await, Err(HostError::Constraint(_))));
    assert!(matches!(completion.await, Err(HostError::Constraint(_))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn set_get_has_delete_round_trip(key in key_value(), value in storable_value()) {
        runtime().block_on(async {
            let fixture = TestFixture::memory();
            fixture
                .with_area(|area| async move {
                    area.set(key.clone(), value.clone()).await.unwrap();
                    assert_eq!(area.get(key.clone()).await.unwrap(), Some(value));
                    assert!(area.has(key.clone()).await.unwrap());

                    area.delete(key.clone()).await.unwrap();
                    assert_eq!(area.get(key.clone()).await.unwrap(), None);
                    assert!(!area.has(key).await.unwrap());
                })
                .await;
        });
    }

    #[test]
    fn disallowed_keys_are_data_errors(value in disallowed_key_value()) {
        runtime().block_on(async {
            let fixture = TestFixture::memory();
            let area = fixture.fresh_area();

            assert!(matches!(area.get(value.clone()).await, Err(StorageError::Data(_))));
            assert!(matches!(area.set(value.clone(), 1).await, Err(StorageError::Data(_))));
            assert!(matches!(area.has(value.clone()).await, Err(StorageError::Data(_))));
            assert!(matches!(area.delete(value).await, Err(StorageError::Data(_))));

            let database = area.backing_store().database;
            assert!(fixture.factory.open_connections(&database).unwrap().is_empty());
        });
    }
}
