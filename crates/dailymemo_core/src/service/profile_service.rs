//! Profile read/update use-cases.
//!
//! # Invariants
//! - A profile update checks the current password and writes the changes in
//!   the same transaction; a wrong password writes nothing.
//! - The returned `Account` never carries the password hash when serialized.

use crate::auth::password::{hash_password, verify_password};
use crate::error::{CoreError, CoreResult};
use crate::model::account::{Account, AccountId, ProfileUpdate, Room};
use crate::repo::account_repo::{AccountRepository, ProfileChanges};
use crate::repo::RepoError;
use crate::service::auth_service::AuthContext;
use log::{info, warn};

pub struct ProfileService<'ctx, R: AccountRepository> {
    repo: R,
    context: &'ctx AuthContext,
}

impl<'ctx, R: AccountRepository> ProfileService<'ctx, R> {
    pub fn new(repo: R, context: &'ctx AuthContext) -> Self {
        Self { repo, context }
    }

    /// Loads one account profile.
    pub fn get_profile(&self, account_id: AccountId) -> CoreResult<Account> {
        self.repo
            .get_account(account_id)?
            .ok_or(CoreError::RecordNotFound {
                entity: "account",
                id: account_id,
            })
    }

    /// Lists rooms owned by the account, oldest first.
    pub fn list_rooms(&self, account_id: AccountId) -> CoreResult<Vec<Room>> {
        Ok(self.repo.list_owned_rooms(account_id)?)
    }

    /// Applies `update` after re-checking `current_password`.
    ///
    /// Wrong current password is `InvalidCredentials`.
    pub fn update_profile(
        &mut self,
        account_id: AccountId,
        current_password: &str,
        update: &ProfileUpdate,
    ) -> CoreResult<Account> {
        update.validate()?;
        let secret = match update.new_password.as_deref() {
            Some(password) => Some(hash_password(password, self.context.password_hash_cost())?),
            None => None,
        };
        let changes = ProfileChanges {
            display_name: update
                .display_name
                .as_deref()
                .map(|name| name.trim().to_string()),
            secret,
            avatar_ref: update.avatar_ref.clone(),
        };

        let mut authorize =
            |current: &Account| matches!(verify_password(current_password, &current.secret), Ok(true));
        match self.repo.update_profile(account_id, &changes, &mut authorize) {
            Ok(account) => {
                info!(
                    "event=profile_update module=profile status=ok account_id={} password_changed={}",
                    account_id,
                    changes.secret.is_some()
                );
                Ok(account)
            }
            Err(RepoError::Rejected(_)) => {
                warn!(
                    "event=profile_update module=profile status=error account_id={} error_code=invalid_credentials",
                    account_id
                );
                Err(CoreError::InvalidCredentials)
            }
            Err(err) => {
                let err = CoreError::from(err);
                warn!(
                    "event=profile_update module=profile status=error account_id={} error_code={}",
                    account_id,
                    err.kind().code()
                );
                Err(err)
            }
        }
    }
}
