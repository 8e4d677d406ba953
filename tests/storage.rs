//! Storage Integration Tests
//!
//! Tests for the JSON and SQLite archive backends.

use playlist_archive::storage::json::parse_archive;
use playlist_archive::storage::{JsonArchive, SqliteArchive, StorageBackend, StoreSettings, UpsertField};
use playlist_archive::{reconcile, ArchiveStore, Item, Snapshot, Status, StoreError};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn sample() -> Snapshot {
    vec![
        Item::new("a", "First", Status::Available),
        Item::new("b", "Second", Status::Private),
        Item::new("c", "Third", Status::Raw("blocked".to_string())),
    ]
    .into()
}

#[test]
fn test_non_list_archive_is_unsupported() {
    for (content, found) in [
        (r#"{"a": {"status": "available"}}"#, "object"),
        ("\"text\"", "string"),
        ("null", "null"),
    ] {
        match parse_archive(content) {
            Err(StoreError::UnsupportedFormat { found: f }) => assert_eq!(f, found),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
    }
}

#[test]
fn test_archive_with_duplicate_ids_is_rejected() {
    let content = r#"[
        {"id": "a", "url": "", "title": "A", "status": "available"},
        {"id": "a", "url": "", "title": "A", "status": "private"}
    ]"#;

    assert!(matches!(parse_archive(content), Err(StoreError::Record(_))));
}

#[test]
fn test_archive_record_without_id_is_rejected() {
    let content = r#"[{"title": "A", "status": "available"}]"#;

    assert!(matches!(parse_archive(content), Err(StoreError::Record(_))));
}

#[tokio::test]
async fn test_json_archive_missing_file_is_empty() {
    let temp = TempDir::new().unwrap();
    let store = JsonArchive::in_dir(temp.path(), "Nothing");

    let snapshot = assert_ok!(store.load().await);
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn test_json_archive_preserves_records_and_order() {
    let temp = TempDir::new().unwrap();
    let store = JsonArchive::in_dir(&temp.path().join("archives"), "Favorites");

    assert_ok!(store.save(&sample()).await);
    assert!(store.path().exists());
    assert!(!store.path().with_extension("json.tmp").exists());

    let loaded = assert_ok!(store.load().await);
    assert_eq!(loaded.ids(), vec!["a", "b", "c"]);
    for (saved, read) in sample().iter().zip(loaded.iter()) {
        assert!(saved.same_record(read));
    }
}

#[tokio::test]
async fn test_json_archive_corrupt_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let store = JsonArchive::in_dir(temp.path(), "Broken");
    tokio::fs::write(store.path(), "{\"version\": 1}").await.unwrap();

    assert_err!(store.load().await);
}

#[tokio::test]
async fn test_sqlite_archive_keeps_archive_order() {
    let temp = TempDir::new().unwrap();
    let store = SqliteArchive::new(temp.path().join("archive.sqlite3"), "Favorites");

    assert_ok!(store.save(&sample()).await);

    let loaded = assert_ok!(store.load().await);
    assert_eq!(loaded.ids(), vec!["a", "b", "c"]);
    assert_eq!(
        loaded.get("c").unwrap().status,
        Status::Raw("blocked".to_string())
    );
}

#[tokio::test]
async fn test_sqlite_upsert_refreshes_status_after_reconcile() {
    let temp = TempDir::new().unwrap();
    let settings = StoreSettings {
        backend: StorageBackend::Sqlite,
        archives_dir: temp.path().to_path_buf(),
        upsert_field: UpsertField::Status,
    };
    let store = settings.open("Favorites");

    assert_ok!(store.save(&sample()).await);

    let fresh: Snapshot = vec![
        Item::new("a", "First", Status::Private),
        Item::new("d", "Fourth", Status::from("public")),
    ]
    .into();
    let archived = assert_ok!(store.load().await);
    let result = reconcile(archived, fresh).unwrap();
    assert_ok!(store.save(&result.merged).await);

    let loaded = assert_ok!(store.load().await);
    assert_eq!(loaded.ids(), vec!["a", "b", "c", "d"]);
    assert_eq!(loaded.get("a").unwrap().status, Status::Private);
    assert_eq!(loaded.get("b").unwrap().status, Status::Removed);
    assert_eq!(loaded.get("d").unwrap().status, Status::Available);
}

#[tokio::test]
async fn test_sqlite_title_upsert_persists_transitions() {
    let temp = TempDir::new().unwrap();
    let settings = StoreSettings {
        backend: StorageBackend::Sqlite,
        archives_dir: temp.path().to_path_buf(),
        upsert_field: UpsertField::Title,
    };
    let store = settings.open("Favorites");

    let archived: Snapshot = vec![
        Item::new("a", "First", Status::Available),
        Item::new("b", "Second", Status::Available),
    ]
    .into();
    assert_ok!(store.save(&archived).await);

    let fresh: Snapshot = vec![Item::new("a", "First", Status::Private)].into();

    let first = reconcile(assert_ok!(store.load().await), fresh.clone()).unwrap();
    assert_eq!(first.counts.private, 1);
    assert_eq!(first.counts.removed, 1);
    assert_ok!(store.save(&first.merged).await);

    let loaded = assert_ok!(store.load().await);
    assert_eq!(loaded.get("a").unwrap().status, Status::Private);
    assert_eq!(loaded.get("b").unwrap().status, Status::Removed);

    // Same fetch again: the transitions were stored, so nothing is re-counted
    let second = reconcile(loaded, fresh).unwrap();
    assert_eq!(second.counts.total(), 0);
}

#[tokio::test]
async fn test_backends_share_the_snapshot_contract() {
    let temp = TempDir::new().unwrap();

    for backend in [StorageBackend::Json, StorageBackend::Sqlite] {
        let settings = StoreSettings {
            backend,
            archives_dir: temp.path().join(backend.to_string()),
            upsert_field: UpsertField::Status,
        };
        let store = settings.open("Mix");

        assert!(assert_ok!(store.load().await).is_empty());
        assert_ok!(store.save(&sample()).await);
        assert_eq!(assert_ok!(store.load().await).len(), 3, "backend {}", backend);
    }
}
