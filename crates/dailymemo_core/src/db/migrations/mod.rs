//! Schema migrations for the memo store.
//!
//! # Responsibility
//! - Keep the ordered list of embedded SQL migrations.
//! - Bring a connection up to `latest_version()` in one transaction.
//! - Confirm the columns the repositories read are present afterwards.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one per entry.
//! - `PRAGMA user_version` always equals the last applied version.
//! - A database reporting the latest version but lacking a required column
//!   is rejected instead of failing later inside a request.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "memo_place_metadata",
        sql: include_str!("0002_memo_place_metadata.sql"),
    },
];

/// Columns selected by the account, memo and comment repositories.
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "accounts",
        &["id", "identifier", "secret", "display_name", "default_room_id"],
    ),
    ("rooms", &["id", "owner_account_id", "code", "name"]),
    (
        "memos",
        &["id", "account_id", "room_id", "rating", "is_pinned", "is_wishlist", "place_url"],
    ),
    ("comments", &["id", "memo_id", "account_id", "rating"]),
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies pending migrations, then checks the resulting schema.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = user_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    if from_version < latest {
        let tx = conn.transaction()?;
        for migration in MIGRATIONS.iter().filter(|m| m.version > from_version) {
            let started_at = Instant::now();
            tx.execute_batch(migration.sql)?;
            tx.pragma_update(None, "user_version", migration.version)?;
            info!(
                "event=db_migrate module=db status=ok version={} name={} duration_ms={}",
                migration.version,
                migration.name,
                started_at.elapsed().as_millis()
            );
        }
        tx.commit()?;
    }

    verify_required_columns(conn)
}

fn verify_required_columns(conn: &Connection) -> DbResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    for &(table, columns) in REQUIRED_COLUMNS {
        let present = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for &column in columns.iter() {
            if !present.iter().any(|name| name == column) {
                return Err(DbError::SchemaMismatch { table, column });
            }
        }
    }
    Ok(())
}

fn user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::{latest_version, MIGRATIONS};

    #[test]
    fn versions_are_contiguous_from_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1, "{}", migration.name);
        }
        assert_eq!(latest_version() as usize, MIGRATIONS.len());
    }
}
