use subwatch_core::db::migrations::latest_version;
use subwatch_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "subscription_tasks");
    assert_table_exists(&conn, "store_sequence");
    assert_table_exists(&conn, "referendum_status");
    assert_eq!(sequence_value(&conn), 0);
}

#[test]
fn reopening_file_database_keeps_schema_and_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("subwatch.db");

    let conn = open_db(&path).unwrap();
    conn.execute("UPDATE store_sequence SET last_version = 41 WHERE id = 1;", [])
        .unwrap();
    drop(conn);

    let reopened = open_db(&path).unwrap();
    assert_eq!(schema_version(&reopened), latest_version());
    assert_eq!(sequence_value(&reopened), 41);
}

#[test]
fn older_file_database_gets_only_the_missing_steps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("previous.db");

    let conn = open_db(&path).unwrap();
    conn.execute_batch(
        "DROP TABLE referendum_status;
         UPDATE store_sequence SET last_version = 7 WHERE id = 1;
         PRAGMA user_version = 2;",
    )
    .unwrap();
    drop(conn);

    let upgraded = open_db(&path).unwrap();
    assert_eq!(schema_version(&upgraded), latest_version());
    assert_table_exists(&upgraded, "referendum_status");
    assert_eq!(sequence_value(&upgraded), 7);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
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
fn status_column_rejects_unknown_values() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO subscription_tasks
            (task_key, chain_id, action, status, version, record, created_at, updated_at)
         VALUES ('k', 'Polkadot', 'a', 'paused', 1, '{}', 0, 0);",
        [],
    );
    assert!(result.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn sequence_value(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT last_version FROM store_sequence WHERE id = 1;",
        [],
        |row| row.get(0),
    )
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
