//! SQLite storage bootstrap, schema migrations and scoped transactions.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the memo core.
//! - Apply schema migrations in deterministic order.
//! - Provide the scoped transaction helper used by multi-row writes.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - One connection serves one request; connections are never shared across
//!   threads.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod tx;

pub use open::{open_db, open_db_in_memory, DbOptions};
pub use tx::with_transaction;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The schema version is current but a column the repositories read is
    /// absent.
    SchemaMismatch {
        table: &'static str,
        column: &'static str,
    },
}

impl DbError {
    /// Returns whether the underlying SQLite error is a `UNIQUE` violation on
    /// `table.column`.
    pub fn is_unique_violation(&self, table: &str, column: &str) -> bool {
        let Self::Sqlite(rusqlite::Error::SqliteFailure(code, Some(message))) = self else {
            return false;
        };
        code.code == rusqlite::ErrorCode::ConstraintViolation
            && message.contains("UNIQUE")
            && message.contains(&format!("{table}.{column}"))
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaMismatch { table, column } => {
                write!(f, "database schema is missing column `{table}.{column}`")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::SchemaMismatch { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
