//! Scoped write transactions.
//!
//! # Invariants
//! - The transaction commits only when the body returns `Ok`.
//! - Any `Err` or unwind drops the `Transaction`, which rolls back.
//! - Transactions start with `BEGIN IMMEDIATE` so the write lock is taken up
//!   front and concurrent writers queue on `busy_timeout` instead of failing
//!   mid-transaction on lock upgrade.

use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Runs `body` inside one immediate transaction.
///
/// The error type only needs to absorb `rusqlite::Error`, so repository and
/// service errors can both use this helper directly.
pub fn with_transaction<T, E, F>(conn: &mut Connection, body: F) -> Result<T, E>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    E: From<rusqlite::Error>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = body(&tx)?;
    tx.commit()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::with_transaction;
    use crate::db::open_db_in_memory;
    use rusqlite::Connection;

    fn account_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM accounts;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn commits_when_body_succeeds() {
        let mut conn = open_db_in_memory().unwrap();
        with_transaction::<_, rusqlite::Error, _>(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO accounts (identifier, secret, display_name) VALUES ('a', 'x', 'A');",
                [],
            )
        })
        .unwrap();
        assert_eq!(account_count(&conn), 1);
    }

    #[test]
    fn rolls_back_every_statement_when_body_fails() {
        let mut conn = open_db_in_memory().unwrap();
        let result = with_transaction::<(), rusqlite::Error, _>(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO accounts (identifier, secret, display_name) VALUES ('a', 'x', 'A');",
                [],
            )?;
            tx.execute(
                "INSERT INTO accounts (identifier, secret, display_name) VALUES ('a', 'y', 'B');",
                [],
            )?;
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(account_count(&conn), 0);
    }

    #[test]
    fn rolls_back_when_body_panics() {
        let mut conn = open_db_in_memory().unwrap();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = with_transaction::<(), rusqlite::Error, _>(&mut conn, |tx| {
                tx.execute(
                    "INSERT INTO accounts (identifier, secret, display_name) VALUES ('a', 'x', 'A');",
                    [],
                )?;
                panic!("boom");
            });
        }));
        assert!(outcome.is_err());
        assert_eq!(account_count(&conn), 0);
    }
}
