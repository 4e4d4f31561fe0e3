use dailymemo_core::db::migrations::latest_version;
use dailymemo_core::db::{open_db, open_db_in_memory, DbError, DbOptions};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "accounts");
    assert_table_exists(&conn, "rooms");
    assert_table_exists(&conn, "memos");
    assert_table_exists(&conn, "comments");
    assert_column_exists(&conn, "memos", "is_wishlist");
    assert_column_exists(&conn, "memos", "place_url");
}

#[test]
fn reopening_file_database_is_idempotent_and_uses_wal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dailymemo.db");

    let first = open_db(&path, DbOptions::default()).unwrap();
    assert_eq!(schema_version(&first), latest_version());
    drop(first);

    let second = open_db(&path, DbOptions::default()).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    let journal_mode: String = second
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_ascii_lowercase(), "wal");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path, DbOptions::default()).unwrap_err() {
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
fn current_version_without_expected_columns_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hand-made.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE accounts (id INTEGER PRIMARY KEY, identifier TEXT);
         PRAGMA user_version = {};",
        latest_version()
    ))
    .unwrap();
    drop(conn);

    match open_db(&path, DbOptions::default()).unwrap_err() {
        DbError::SchemaMismatch { table, column } => {
            assert_eq!(table, "accounts");
            assert_eq!(column, "secret");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_enforces_unique_identifier_and_rating_range() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO accounts (identifier, secret, display_name) VALUES ('amy', 'x', 'Amy');",
        [],
    )
    .unwrap();

    let duplicate = conn
        .execute(
            "INSERT INTO accounts (identifier, secret, display_name) VALUES ('amy', 'y', 'Amy 2');",
            [],
        )
        .map_err(DbError::from)
        .unwrap_err();
    assert!(duplicate.is_unique_violation("accounts", "identifier"));
    assert!(!duplicate.is_unique_violation("rooms", "code"));

    conn.execute(
        "INSERT INTO rooms (code, name, owner_account_id) VALUES ('c1', 'Amy''s room', 1);",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO memos (account_id, room_id, title) VALUES (1, 1, 'lunch');",
        [],
    )
    .unwrap();
    let out_of_range = conn.execute(
        "INSERT INTO comments (memo_id, account_id, content, rating) VALUES (1, 1, 'wow', 6);",
        [],
    );
    assert!(out_of_range.is_err());
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

fn assert_column_exists(conn: &Connection, table_name: &str, column: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2);",
            [table_name, column],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "column {table_name}.{column} does not exist");
}
