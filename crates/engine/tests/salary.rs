use engine::{EngineError, Money, Month, ResultEngine, SalaryBook, SalaryStore, SqliteStore};
use serde_json::{Value, json};

mod common;

use common::store_with_file_db;

/// Accepts reads, rejects every write.
#[derive(Clone)]
struct ReadOnlyStore {
    inner: SqliteStore,
}

impl SalaryStore for ReadOnlyStore {
    async fn get(&self, owner_id: &str) -> ResultEngine<Option<Value>> {
        self.inner.get(owner_id).await
    }

    async fn merge_set(&self, _owner_id: &str, _partial: Value) -> ResultEngine<()> {
        Err(EngineError::RemoteWrite("permission denied".to_string()))
    }
}

fn month(index: u8) -> Month {
    Month::new(index).unwrap()
}

#[tokio::test]
async fn missing_document_reads_zero() {
    let (store, _path) = store_with_file_db().await;
    let book = SalaryBook::load(store, "alice").await.unwrap();
    assert!(book.map().is_empty());
    assert_eq!(book.read_salary(2024, month(0)), Money::ZERO);
}

#[tokio::test]
async fn writes_keep_sibling_months_and_years() {
    let (store, _path) = store_with_file_db().await;
    let mut book = SalaryBook::load(store.clone(), "alice").await.unwrap();

    book.write_salary(2024, month(0), Money::new(500_000)).await.unwrap();
    book.write_salary(2024, month(1), Money::new(300_000)).await.unwrap();
    book.write_salary(2025, month(0), Money::new(520_000)).await.unwrap();

    let reloaded = SalaryBook::load(store.clone(), "alice").await.unwrap();
    assert_eq!(reloaded.read_salary(2024, month(0)), Money::new(500_000));
    assert_eq!(reloaded.read_salary(2024, month(1)), Money::new(300_000));
    assert_eq!(reloaded.read_salary(2025, month(0)), Money::new(520_000));
    assert_eq!(reloaded.read_salary(2025, month(1)), Money::ZERO);

    let document = store.get("alice").await.unwrap().unwrap();
    assert_eq!(
        document,
        json!({ "salary": {
            "2024": { "0": 500000, "1": 300000 },
            "2025": { "0": 520000 },
        }})
    );
}

#[tokio::test]
async fn overwrite_changes_only_that_leaf() {
    let (store, _path) = store_with_file_db().await;
    let mut book = SalaryBook::load(store.clone(), "alice").await.unwrap();
    book.write_salary(2024, month(0), Money::new(500_000)).await.unwrap();
    book.write_salary(2024, month(1), Money::new(300_000)).await.unwrap();

    book.write_salary(2024, month(0), Money::new(0)).await.unwrap();
    assert_eq!(book.map().get(2024, month(0)), Some(Money::ZERO));

    let reloaded = SalaryBook::load(store, "alice").await.unwrap();
    assert_eq!(reloaded.map().get(2024, month(0)), Some(Money::ZERO));
    assert_eq!(reloaded.read_salary(2024, month(1)), Money::new(300_000));
}

#[tokio::test]
async fn unrelated_document_keys_survive_writes() {
    let (store, _path) = store_with_file_db().await;
    store
        .merge_set("alice", json!({ "displayName": "Alice", "salary": { "2023": { "11": 1 } } }))
        .await
        .unwrap();

    let mut book = SalaryBook::load(store.clone(), "alice").await.unwrap();
    assert_eq!(book.read_salary(2023, month(11)), Money::new(1));
    book.write_salary(2024, month(5), Money::new(42)).await.unwrap();

    let document = store.get("alice").await.unwrap().unwrap();
    assert_eq!(document["displayName"], json!("Alice"));
    assert_eq!(document["salary"]["2023"]["11"], json!(1));
    assert_eq!(document["salary"]["2024"]["5"], json!(42));
}

#[tokio::test]
async fn owners_do_not_share_documents() {
    let (store, _path) = store_with_file_db().await;
    let mut alice = SalaryBook::load(store.clone(), "alice").await.unwrap();
    alice.write_salary(2024, month(0), Money::new(10)).await.unwrap();

    let bob = SalaryBook::load(store, "bob").await.unwrap();
    assert_eq!(bob.read_salary(2024, month(0)), Money::ZERO);
}

#[tokio::test]
async fn legacy_flat_salary_reads_as_unset() {
    let (store, _path) = store_with_file_db().await;
    store.merge_set("alice", json!({ "salary": 250000 })).await.unwrap();

    let mut book = SalaryBook::load(store.clone(), "alice").await.unwrap();
    assert!(book.map().is_empty());

    book.write_salary(2024, month(2), Money::new(7)).await.unwrap();
    let reloaded = SalaryBook::load(store, "alice").await.unwrap();
    assert_eq!(reloaded.read_salary(2024, month(2)), Money::new(7));
}

#[tokio::test]
async fn negative_salary_is_rejected_without_writing() {
    let (store, _path) = store_with_file_db().await;
    let mut book = SalaryBook::load(store.clone(), "alice").await.unwrap();

    let err = book
        .write_salary(2024, month(0), Money::new(-1))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = book
        .write_salary(2024, month(0), Money::new(Money::MAX.value() + 1))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.get("alice").await.unwrap(), None);
}

#[tokio::test]
async fn failed_write_leaves_cache_untouched() {
    let (store, _path) = store_with_file_db().await;
    store
        .merge_set("alice", json!({ "salary": { "2024": { "0": 100 } } }))
        .await
        .unwrap();

    let mut book = SalaryBook::load(ReadOnlyStore { inner: store }, "alice")
        .await
        .unwrap();
    let err = book
        .write_salary(2024, month(0), Money::new(900))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::RemoteWrite("permission denied".to_string()));
    assert_eq!(book.read_salary(2024, month(0)), Money::new(100));
}

#[tokio::test]
async fn merge_set_rejects_non_objects() {
    let (store, _path) = store_with_file_db().await;
    let err = store.merge_set("alice", json!([1, 2, 3])).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidDocument(_)));
}
