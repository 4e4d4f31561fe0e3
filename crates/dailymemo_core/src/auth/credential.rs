//! Identifier/password verification.
//!
//! # Invariants
//! - "No such account" and "wrong password" are one error kind.
//! - Unknown identifiers still pay for one hash comparison, so response time
//!   does not reveal whether an identifier exists.
//! - Read-only: no store writes.

use crate::auth::password::{hash_password, verify_password, PasswordError};
use crate::model::account::Account;
use crate::repo::account_repo::AccountRepository;
use crate::repo::RepoError;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DUMMY_PASSWORD: &str = "dailymemo-credential-probe";

/// Credential check failure.
#[derive(Debug)]
pub enum CredentialError {
    InvalidCredentials,
    Storage(RepoError),
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid account identifier or password"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CredentialError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidCredentials => None,
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<RepoError> for CredentialError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

/// Resolves accounts from identifier/password assertions.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    dummy_hash: String,
}

impl CredentialVerifier {
    /// Builds a verifier whose miss path costs the same as `hash_cost`.
    pub fn new(hash_cost: u32) -> Result<Self, PasswordError> {
        Ok(Self {
            dummy_hash: hash_password(DUMMY_PASSWORD, hash_cost)?,
        })
    }

    /// Returns the account matching `identifier` when `password` is correct.
    pub fn verify<R: AccountRepository + ?Sized>(
        &self,
        repo: &R,
        identifier: &str,
        password: &str,
    ) -> Result<Account, CredentialError> {
        let Some(account) = repo.find_by_identifier(identifier)? else {
            let _ = verify_password(password, &self.dummy_hash);
            return Err(CredentialError::InvalidCredentials);
        };

        match verify_password(password, &account.secret) {
            Ok(true) => Ok(account),
            Ok(false) => Err(CredentialError::InvalidCredentials),
            Err(err) => {
                warn!(
                    "event=credential_verify module=auth status=error account_id={} error_code=unreadable_secret error={}",
                    account.id, err
                );
                Err(CredentialError::InvalidCredentials)
            }
        }
    }
}
