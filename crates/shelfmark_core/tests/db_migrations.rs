use rusqlite::Connection;
use shelfmark_core::db::migrations::latest_version;
use shelfmark_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "nodes");
    assert_table_exists(&conn, "node_tags");

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shelfmark.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "nodes");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_items_without_parent_or_kind() {
    let conn = open_db_in_memory().unwrap();

    let root_item = conn.execute(
        "INSERT INTO nodes (node_uuid, kind, parent_uuid, name, item_kind, created_at, updated_at)
         VALUES ('i-1', 'item', NULL, 'loose', 'note', 0, 0);",
        [],
    );
    assert!(root_item.is_err());

    let folder_with_kind = conn.execute(
        "INSERT INTO nodes (node_uuid, kind, parent_uuid, name, item_kind, created_at, updated_at)
         VALUES ('f-1', 'folder', NULL, 'odd', 'note', 0, 0);",
        [],
    );
    assert!(folder_with_kind.is_err());

    let dangling_parent = conn.execute(
        "INSERT INTO nodes (node_uuid, kind, parent_uuid, name, created_at, updated_at)
         VALUES ('f-2', 'folder', 'missing', 'child', 0, 0);",
        [],
    );
    assert!(dangling_parent.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
