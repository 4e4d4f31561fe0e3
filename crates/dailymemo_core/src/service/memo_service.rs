//! Memo use-cases.
//!
//! # Responsibility
//! - Resolve the target room (explicit or the author's default room).
//! - Scope reads and writes to the authoring account.
//!
//! # Invariants
//! - A memo can only be placed in a room its author owns.
//! - Reading, updating or deleting someone else's memo is `RecordNotFound`,
//!   the same as a missing memo.
//! - Listing someone else's room is `Forbidden`.
//! - `rating` is never taken from input; new memos start at 0.

use crate::error::{CoreError, CoreResult};
use crate::model::account::{AccountId, RoomId};
use crate::model::memo::{Memo, MemoDraft, MemoId};
use crate::repo::memo_repo::MemoRepository;
use log::{info, warn};

/// Memo list filter. `None` lists everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoListFilter {
    pub wishlist: Option<bool>,
}

pub struct MemoService<R: MemoRepository> {
    repo: R,
}

impl<R: MemoRepository> MemoService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a memo and returns it as stored.
    ///
    /// `draft.room_id == None` targets the author's default room.
    pub fn create_memo(&self, account_id: AccountId, draft: &MemoDraft) -> CoreResult<Memo> {
        draft.validate()?;
        let room_id = self.resolve_room(account_id, draft.room_id)?;

        let memo_id = self
            .repo
            .create_memo(account_id, room_id, draft)
            .map_err(|err| log_failure("memo_create", account_id, CoreError::from(err)))?;
        info!(
            "event=memo_create module=memo status=ok account_id={} memo_id={} room_id={}",
            account_id, memo_id, room_id
        );
        self.get_memo(account_id, memo_id)
    }

    /// Loads one memo written by `account_id`.
    pub fn get_memo(&self, account_id: AccountId, memo_id: MemoId) -> CoreResult<Memo> {
        match self.repo.get_memo(memo_id)? {
            Some(memo) if memo.account_id == account_id => Ok(memo),
            _ => Err(CoreError::RecordNotFound {
                entity: "memo",
                id: memo_id,
            }),
        }
    }

    /// Lists the account's memos, pinned first, newest first.
    pub fn list_memos(&self, account_id: AccountId, filter: MemoListFilter) -> CoreResult<Vec<Memo>> {
        Ok(self.repo.list_by_account(account_id, filter.wishlist)?)
    }

    /// Lists memos in one of the account's rooms, pinned first, newest first.
    ///
    /// A room owned by another account is `Forbidden`.
    pub fn list_room_memos(&self, account_id: AccountId, room_id: RoomId) -> CoreResult<Vec<Memo>> {
        self.ensure_room_owner(account_id, room_id)?;
        Ok(self.repo.list_by_room(account_id, room_id)?)
    }

    /// Replaces the author-editable fields of a memo.
    ///
    /// `draft.room_id == None` keeps the memo in its current room.
    pub fn update_memo(
        &self,
        account_id: AccountId,
        memo_id: MemoId,
        draft: &MemoDraft,
    ) -> CoreResult<Memo> {
        draft.validate()?;
        if let Some(room_id) = draft.room_id {
            self.ensure_room_owner(account_id, room_id)?;
        }

        self.repo
            .update_memo(account_id, memo_id, draft)
            .map_err(|err| log_failure("memo_update", account_id, CoreError::from(err)))?;
        info!(
            "event=memo_update module=memo status=ok account_id={} memo_id={}",
            account_id, memo_id
        );
        self.get_memo(account_id, memo_id)
    }

    /// Deletes a memo and, by cascade, its comments.
    pub fn delete_memo(&self, account_id: AccountId, memo_id: MemoId) -> CoreResult<()> {
        self.repo
            .delete_memo(account_id, memo_id)
            .map_err(|err| log_failure("memo_delete", account_id, CoreError::from(err)))?;
        info!(
            "event=memo_delete module=memo status=ok account_id={} memo_id={}",
            account_id, memo_id
        );
        Ok(())
    }

    fn resolve_room(&self, account_id: AccountId, requested: Option<RoomId>) -> CoreResult<RoomId> {
        match requested {
            Some(room_id) => {
                self.ensure_room_owner(account_id, room_id)?;
                Ok(room_id)
            }
            None => self
                .repo
                .default_room_id(account_id)?
                .ok_or(CoreError::RecordNotFound {
                    entity: "default room",
                    id: account_id,
                }),
        }
    }

    fn ensure_room_owner(&self, account_id: AccountId, room_id: RoomId) -> CoreResult<()> {
        if self.repo.owns_room(account_id, room_id)? {
            Ok(())
        } else {
            Err(log_failure(
                "memo_room_check",
                account_id,
                CoreError::Forbidden("room is not owned by the account"),
            ))
        }
    }
}

fn log_failure(event: &str, account_id: AccountId, err: CoreError) -> CoreError {
    warn!(
        "event={} module=memo status=error account_id={} error_code={}",
        event,
        account_id,
        err.kind().code()
    );
    err
}
