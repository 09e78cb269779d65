use storage::progress_table::{ProgressTable, decode_table, encode_table};
use storage::repository::{KeyValueStore, Storage, StorageError};
use storage::sqlite::SqliteStore;
use tutorial_core::model::{StepNumber, TutorialId, TutorialProgress};
use tutorial_core::time::fixed_now;

#[tokio::test]
async fn sqlite_items_survive_reconnect() {
    let url = "sqlite:file:memdb_reconnect?mode=memory&cache=shared";
    let first = SqliteStore::connect(url).await.expect("connect");
    first.migrate().await.expect("migrate");

    first.set_item("greeting", "hello").await.unwrap();
    first.set_item("greeting", "hello again").await.unwrap();

    // A second pool on the same shared-cache database sees the write.
    let second = SqliteStore::connect(url).await.expect("connect");
    second.migrate().await.expect("migrations are idempotent");
    assert_eq!(
        second.get_item("greeting").await.unwrap().as_deref(),
        Some("hello again")
    );

    second.remove_item("greeting").await.unwrap();
    assert!(first.get_item("greeting").await.unwrap().is_none());
    second.remove_item("greeting").await.unwrap();
}

#[tokio::test]
async fn sqlite_enforces_quota() {
    let storage = Storage::sqlite("sqlite:file:memdb_quota?mode=memory&cache=shared", Some(16))
        .await
        .expect("open");

    storage.local.set_item("a", "0123456789").await.unwrap();
    let err = storage.local.set_item("b", "0123456789").await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::QuotaExceeded {
            limit: 16,
            attempted: 22
        }
    ));
    // Overwriting an existing key only counts the new value.
    storage.local.set_item("a", "01234567890123").await.unwrap();
    assert!(storage.local.get_item("b").await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_holds_an_encoded_progress_table() {
    let storage = Storage::sqlite("sqlite:file:memdb_table?mode=memory&cache=shared", None)
        .await
        .expect("open");

    let mut table = ProgressTable::new();
    table.insert(
        TutorialId::new("demo-1").unwrap(),
        TutorialProgress::from_persisted(
            [StepNumber::new(1).unwrap(), StepNumber::new(3).unwrap()],
            fixed_now(),
        ),
    );
    let payload = encode_table(&table).unwrap();
    storage
        .local
        .set_item("greentic-tutorial-progress", &payload)
        .await
        .unwrap();

    let raw = storage
        .local
        .get_item("greentic-tutorial-progress")
        .await
        .unwrap()
        .expect("stored");
    assert_eq!(decode_table(&raw).unwrap(), table);
}
