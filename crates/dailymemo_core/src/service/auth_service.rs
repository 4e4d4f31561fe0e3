//! Sign-in / sign-up facade.
//!
//! # Responsibility
//! - Gate self-registration behind the shared admission code.
//! - Provision account + default room, then issue a token pair.
//! - Verify credentials and issue a token pair.
//!
//! # Invariants
//! - No account row is written when sign-up fails before provisioning.
//! - Provisioning and token issuance are separate failure domains: an
//!   issuance failure after commit does not undo the account and surfaces as
//!   `CoreError::AccountCreatedWithoutSession`.
//! - Password, password hash and tokens never appear in log lines.

use crate::auth::password::hash_password;
use crate::auth::{Claims, CredentialVerifier, TokenIssuer, TokenKind, TokenPair};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::account::{Account, AccountId, NewAccount, RoomId};
use crate::repo::account_repo::{AccountRecord, AccountRepository, ProvisionedAccount};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Read-only authentication settings shared by every request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    issuer: TokenIssuer,
    verifier: CredentialVerifier,
    admission_code: String,
    password_hash_cost: u32,
    clock: fn() -> DateTime<Utc>,
}

impl AuthContext {
    /// Builds the context once at startup. Errors here are fatal.
    pub fn from_config(config: &CoreConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            issuer: TokenIssuer::from_config(config)?,
            verifier: CredentialVerifier::new(config.password_hash_cost)?,
            admission_code: config.admission_code.clone(),
            password_hash_cost: config.password_hash_cost,
            clock: Utc::now,
        })
    }

    /// Replaces the wall clock used to issue and verify tokens.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    pub fn password_hash_cost(&self) -> u32 {
        self.password_hash_cost
    }

    /// Verifies an access token at the context's current instant.
    pub fn authenticate(&self, access_token: &str) -> CoreResult<Claims> {
        Ok(self
            .issuer
            .verify_at(access_token, TokenKind::Access, self.now())?)
    }

    fn issue_token_pair(&self, account_id: AccountId, identifier: &str) -> CoreResult<TokenPair> {
        Ok(self
            .issuer
            .issue_token_pair_at(account_id, identifier, self.now())?)
    }
}

/// Sign-up input including the admission code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub identifier: String,
    pub password: String,
    pub display_name: String,
    pub admission_code: String,
}

/// Authenticated session returned by sign-in, sign-up and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account_id: AccountId,
    pub identifier: String,
    pub display_name: String,
    pub default_room_id: Option<RoomId>,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

impl Session {
    fn new(account: &Account, tokens: TokenPair) -> Self {
        Self {
            account_id: account.id,
            identifier: account.identifier.clone(),
            display_name: account.display_name.clone(),
            default_room_id: account.default_room_id,
            tokens,
        }
    }
}

/// Session facade over an account repository.
pub struct AuthService<'ctx, R: AccountRepository> {
    repo: R,
    context: &'ctx AuthContext,
}

impl<'ctx, R: AccountRepository> AuthService<'ctx, R> {
    pub fn new(repo: R, context: &'ctx AuthContext) -> Self {
        Self { repo, context }
    }

    /// Verifies credentials and issues a token pair.
    ///
    /// Unknown identifier and wrong password both yield
    /// `CoreError::InvalidCredentials`.
    pub fn sign_in(&self, identifier: &str, password: &str) -> CoreResult<Session> {
        info!("event=sign_in module=auth status=start");
        let verified = self
            .context
            .verifier
            .verify(&self.repo, identifier.trim(), password);
        let account = match verified {
            Ok(account) => account,
            Err(err) => {
                let err = CoreError::from(err);
                warn!(
                    "event=sign_in module=auth status=error error_code={}",
                    err.kind().code()
                );
                return Err(err);
            }
        };

        let tokens = self
            .context
            .issue_token_pair(account.id, &account.identifier)
            .map_err(|err| {
                warn!(
                    "event=sign_in module=auth status=error account_id={} error_code={}",
                    account.id,
                    err.kind().code()
                );
                err
            })?;

        info!("event=sign_in module=auth status=ok account_id={}", account.id);
        Ok(Session::new(&account, tokens))
    }

    /// Registers a new account with its default room and signs it in.
    ///
    /// # Contract
    /// - Wrong admission code, invalid input and an existing identifier fail
    ///   before any write.
    /// - A concurrent sign-up that wins the race surfaces here as
    ///   `DuplicateAccount` from the store's uniqueness check.
    /// - Token issuance failure after commit returns
    ///   `AccountCreatedWithoutSession`; the account stays.
    pub fn sign_up(&mut self, request: &SignUpRequest) -> CoreResult<Session> {
        info!("event=sign_up module=auth status=start");
        if request.admission_code != self.context.admission_code {
            warn!("event=sign_up module=auth status=error error_code=invalid_admission_code");
            return Err(CoreError::InvalidAdmissionCode);
        }

        let new_account = NewAccount::new(
            request.identifier.as_str(),
            request.password.as_str(),
            request.display_name.as_str(),
        );
        let provisioned = self.provision_account(&new_account).map_err(|err| {
            warn!(
                "event=sign_up module=auth status=error error_code={}",
                err.kind().code()
            );
            err
        })?;

        let identifier = new_account.identifier.trim();
        match self.context.issue_token_pair(provisioned.account_id, identifier) {
            Ok(tokens) => {
                info!(
                    "event=sign_up module=auth status=ok account_id={} room_id={}",
                    provisioned.account_id, provisioned.room_id
                );
                Ok(Session {
                    account_id: provisioned.account_id,
                    identifier: identifier.to_string(),
                    display_name: new_account.display_name.trim().to_string(),
                    default_room_id: Some(provisioned.room_id),
                    tokens,
                })
            }
            Err(err) => {
                warn!(
                    "event=sign_up module=auth status=error account_id={} error_code=session_not_issued error={}",
                    provisioned.account_id, err
                );
                Err(CoreError::AccountCreatedWithoutSession {
                    account_id: provisioned.account_id,
                })
            }
        }
    }

    /// Creates account, default room and default-room link atomically.
    pub fn provision_account(&mut self, account: &NewAccount) -> CoreResult<ProvisionedAccount> {
        account.validate()?;
        let identifier = account.identifier.trim();
        if self.repo.identifier_exists(identifier)? {
            return Err(CoreError::DuplicateAccount(identifier.to_string()));
        }

        let secret = hash_password(&account.password, self.context.password_hash_cost)?;
        let room_name = account.default_room_name();
        let record = AccountRecord {
            identifier,
            secret: &secret,
            display_name: account.display_name.trim(),
            room_name: &room_name,
        };

        let provisioned = self.repo.provision_account(&record)?;
        info!(
            "event=account_provision module=auth status=ok account_id={} room_id={}",
            provisioned.account_id, provisioned.room_id
        );
        Ok(provisioned)
    }

    /// Exchanges a valid refresh token for a fresh session.
    ///
    /// A token for an account that no longer exists is `InvalidToken`.
    pub fn refresh_session(&self, refresh_token: &str) -> CoreResult<Session> {
        let claims = self
            .context
            .issuer
            .verify_at(refresh_token, TokenKind::Refresh, self.context.now())?;
        let account_id = claims.account_id()?;
        let account = self
            .repo
            .get_account(account_id)?
            .ok_or(CoreError::InvalidToken)?;

        let tokens = self
            .context
            .issue_token_pair(account.id, &account.identifier)?;
        info!(
            "event=session_refresh module=auth status=ok account_id={}",
            account.id
        );
        Ok(Session::new(&account, tokens))
    }
}
