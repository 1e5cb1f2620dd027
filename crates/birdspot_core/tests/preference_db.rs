use birdspot_core::db::migrations::latest_version;
use birdspot_core::db::{open_db, open_db_in_memory, DbError};
use birdspot_core::{KeyValueStore, KvError, SqliteKeyValueStore};
use rusqlite::Connection;

#[test]
fn in_memory_database_has_kv_table_at_latest_version() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'kv_store');",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1);
}

#[test]
fn reopening_keeps_values_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("birdspot.sqlite3");

    let store = SqliteKeyValueStore::open(&path).unwrap();
    store.set("a", "1").unwrap();
    store.set("a", "2").unwrap();
    store.set("b", "x").unwrap();
    store.remove("b").unwrap();
    drop(store);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let store = SqliteKeyValueStore::from_connection(conn);
    assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
    assert_eq!(store.get("b").unwrap(), None);
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 42;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 42);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(matches!(
        SqliteKeyValueStore::open(&path),
        Err(KvError::Db(DbError::UnsupportedSchemaVersion { .. }))
    ));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}
