//! Account/room repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provision an account together with its default room in one transaction.
//! - Serve point reads used by credential checks and profile screens.
//!
//! # Invariants
//! - `provision_account` either commits account + room + default-room link,
//!   or leaves no trace.
//! - A uniqueness violation on `accounts.identifier` surfaces as
//!   `RepoError::DuplicateAccount`, never as a raw store error.
//! - Room codes are fresh v4 UUIDs; a colliding code is regenerated inside
//!   the same transaction.

use crate::db::{with_transaction, DbError};
use crate::model::account::{Account, AccountId, Room, RoomId};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use uuid::Uuid;

const ACCOUNT_SELECT_SQL: &str = "SELECT
    id,
    identifier,
    secret,
    display_name,
    avatar_ref,
    default_room_id,
    created_at
FROM accounts";

const ROOM_CODE_ATTEMPTS: usize = 3;

/// Ids produced by a successful provisioning transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionedAccount {
    pub account_id: AccountId,
    pub room_id: RoomId,
}

/// Already-validated provisioning input. `secret` is a password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord<'a> {
    pub identifier: &'a str,
    pub secret: &'a str,
    pub display_name: &'a str,
    pub room_name: &'a str,
}

/// Stored profile changes. `secret` is a password hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub secret: Option<String>,
    pub avatar_ref: Option<String>,
}

/// Repository interface for account and room persistence.
pub trait AccountRepository {
    /// Returns whether an account with `identifier` exists.
    fn identifier_exists(&self, identifier: &str) -> RepoResult<bool>;
    /// Loads one account by its sign-in identifier.
    fn find_by_identifier(&self, identifier: &str) -> RepoResult<Option<Account>>;
    /// Loads one account by id.
    fn get_account(&self, account_id: AccountId) -> RepoResult<Option<Account>>;
    /// Loads one room by id.
    fn get_room(&self, room_id: RoomId) -> RepoResult<Option<Room>>;
    /// Lists rooms owned by one account, oldest first.
    fn list_owned_rooms(&self, account_id: AccountId) -> RepoResult<Vec<Room>>;
    /// Creates account, default room and the link between them atomically.
    fn provision_account(&mut self, record: &AccountRecord<'_>) -> RepoResult<ProvisionedAccount>;
    /// Applies `changes` if `authorize` accepts the current row, atomically.
    fn update_profile(
        &mut self,
        account_id: AccountId,
        changes: &ProfileChanges,
        authorize: &mut dyn FnMut(&Account) -> bool,
    ) -> RepoResult<Account>;
}

/// SQLite-backed account repository.
pub struct SqliteAccountRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteAccountRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl AccountRepository for SqliteAccountRepository<'_> {
    fn identifier_exists(&self, identifier: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE identifier = ?1);",
            [identifier],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn find_by_identifier(&self, identifier: &str) -> RepoResult<Option<Account>> {
        let account = self
            .conn
            .query_row(
                &format!("{ACCOUNT_SELECT_SQL} WHERE identifier = ?1;"),
                [identifier],
                parse_account_row,
            )
            .optional()?;
        Ok(account)
    }

    fn get_account(&self, account_id: AccountId) -> RepoResult<Option<Account>> {
        load_account(self.conn, account_id)
    }

    fn get_room(&self, room_id: RoomId) -> RepoResult<Option<Room>> {
        let room = self
            .conn
            .query_row(
                "SELECT id, code, name, owner_account_id FROM rooms WHERE id = ?1;",
                [room_id],
                parse_room_row,
            )
            .optional()?;
        Ok(room)
    }

    fn list_owned_rooms(&self, account_id: AccountId) -> RepoResult<Vec<Room>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, code, name, owner_account_id
             FROM rooms
             WHERE owner_account_id = ?1
             ORDER BY id ASC;",
        )?;
        let rooms = stmt
            .query_map([account_id], parse_room_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rooms)
    }

    fn provision_account(&mut self, record: &AccountRecord<'_>) -> RepoResult<ProvisionedAccount> {
        with_transaction(self.conn, |tx| {
            let account_id = insert_account(tx, record)?;
            let room_id = insert_room_with_fresh_code(tx, record.room_name, account_id)?;

            let linked = tx.execute(
                "UPDATE accounts
                 SET
                    default_room_id = ?1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?2;",
                params![room_id, account_id],
            )?;
            if linked != 1 {
                return Err(RepoError::InvalidData(format!(
                    "default room link touched {linked} rows for account {account_id}"
                )));
            }

            Ok(ProvisionedAccount {
                account_id,
                room_id,
            })
        })
    }

    fn update_profile(
        &mut self,
        account_id: AccountId,
        changes: &ProfileChanges,
        authorize: &mut dyn FnMut(&Account) -> bool,
    ) -> RepoResult<Account> {
        with_transaction(self.conn, |tx| {
            let current = load_account(tx, account_id)?.ok_or(RepoError::NotFound {
                entity: "account",
                id: account_id,
            })?;
            if !authorize(&current) {
                return Err(RepoError::Rejected("profile update not authorized"));
            }

            tx.execute(
                "UPDATE accounts
                 SET
                    display_name = COALESCE(?1, display_name),
                    secret = COALESCE(?2, secret),
                    avatar_ref = COALESCE(?3, avatar_ref),
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?4;",
                params![
                    changes.display_name.as_deref(),
                    changes.secret.as_deref(),
                    changes.avatar_ref.as_deref(),
                    account_id,
                ],
            )?;

            load_account(tx, account_id)?.ok_or(RepoError::NotFound {
                entity: "account",
                id: account_id,
            })
        })
    }
}

fn insert_account(tx: &Transaction<'_>, record: &AccountRecord<'_>) -> RepoResult<AccountId> {
    let inserted = tx.execute(
        "INSERT INTO accounts (identifier, secret, display_name) VALUES (?1, ?2, ?3);",
        params![record.identifier, record.secret, record.display_name],
    );

    match inserted {
        Ok(_) => Ok(tx.last_insert_rowid()),
        Err(err) => {
            let err = DbError::from(err);
            if err.is_unique_violation("accounts", "identifier") {
                Err(RepoError::DuplicateAccount(record.identifier.to_string()))
            } else {
                Err(err.into())
            }
        }
    }
}

fn insert_room_with_fresh_code(
    tx: &Transaction<'_>,
    name: &str,
    owner: AccountId,
) -> RepoResult<RoomId> {
    let mut last_error = None;
    for _ in 0..ROOM_CODE_ATTEMPTS {
        let code = Uuid::new_v4().to_string();
        match tx.execute(
            "INSERT INTO rooms (code, name, owner_account_id) VALUES (?1, ?2, ?3);",
            params![code, name, owner],
        ) {
            Ok(_) => return Ok(tx.last_insert_rowid()),
            Err(err) => {
                let err = DbError::from(err);
                if !err.is_unique_violation("rooms", "code") {
                    return Err(err.into());
                }
                last_error = Some(err);
            }
        }
    }

    Err(last_error
        .map(RepoError::from)
        .unwrap_or_else(|| RepoError::InvalidData("room code generation failed".to_string())))
}

fn load_account(conn: &Connection, account_id: AccountId) -> RepoResult<Option<Account>> {
    let account = conn
        .query_row(
            &format!("{ACCOUNT_SELECT_SQL} WHERE id = ?1;"),
            [account_id],
            parse_account_row,
        )
        .optional()?;
    Ok(account)
}

fn parse_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get("id")?,
        identifier: row.get("identifier")?,
        secret: row.get("secret")?,
        display_name: row.get("display_name")?,
        avatar_ref: row.get("avatar_ref")?,
        default_room_id: row.get("default_room_id")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_room_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get("id")?,
        code: row.get("code")?,
        name: row.get("name")?,
        owner_account_id: row.get("owner_account_id")?,
    })
}
