//! Public error taxonomy returned by services.
//!
//! # Invariants
//! - Each service call surfaces exactly one `CoreError`.
//! - Store failures keep their source for diagnostics but are classified
//!   before they leave the core.
//! - Unknown identifier and wrong password are indistinguishable
//!   (`InvalidCredentials`).

use crate::auth::password::PasswordError;
use crate::auth::{CredentialError, TokenError};
use crate::config::ConfigError;
use crate::model::account::AccountId;
use crate::model::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse classification for adapters (status codes, exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DuplicateAccount,
    InvalidCredentials,
    InvalidAdmissionCode,
    RecordNotFound,
    Configuration,
    StorageFailure,
    TokenSigningFailure,
    InvalidToken,
    ExpiredToken,
    InvalidInput,
    Forbidden,
    AccountCreatedWithoutSession,
}

impl ErrorKind {
    /// Stable snake_case code used in log lines and adapter payloads.
    pub fn code(self) -> &'static str {
        match self {
            Self::DuplicateAccount => "duplicate_account",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidAdmissionCode => "invalid_admission_code",
            Self::RecordNotFound => "record_not_found",
            Self::Configuration => "configuration",
            Self::StorageFailure => "storage_failure",
            Self::TokenSigningFailure => "token_signing_failure",
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::InvalidInput => "invalid_input",
            Self::Forbidden => "forbidden",
            Self::AccountCreatedWithoutSession => "account_created_without_session",
        }
    }
}

#[derive(Debug)]
pub enum CoreError {
    DuplicateAccount(String),
    InvalidCredentials,
    InvalidAdmissionCode,
    RecordNotFound { entity: &'static str, id: i64 },
    /// Fatal startup problem.
    Configuration(String),
    /// Transient store failure; not retried by the core.
    StorageFailure(RepoError),
    TokenSigningFailure(String),
    InvalidToken,
    ExpiredToken,
    InvalidInput(ValidationError),
    Forbidden(&'static str),
    /// Sign-up committed but no token pair could be issued; the caller should
    /// sign in.
    AccountCreatedWithoutSession { account_id: AccountId },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateAccount(_) => ErrorKind::DuplicateAccount,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::InvalidAdmissionCode => ErrorKind::InvalidAdmissionCode,
            Self::RecordNotFound { .. } => ErrorKind::RecordNotFound,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::StorageFailure(_) => ErrorKind::StorageFailure,
            Self::TokenSigningFailure(_) => ErrorKind::TokenSigningFailure,
            Self::InvalidToken => ErrorKind::InvalidToken,
            Self::ExpiredToken => ErrorKind::ExpiredToken,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::AccountCreatedWithoutSession { .. } => ErrorKind::AccountCreatedWithoutSession,
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateAccount(identifier) => {
                write!(f, "account identifier already exists: {identifier}")
            }
            Self::InvalidCredentials => write!(f, "invalid account identifier or password"),
            Self::InvalidAdmissionCode => write!(f, "invalid admission code"),
            Self::RecordNotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Configuration(message) => write!(f, "configuration error: {message}"),
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
            Self::TokenSigningFailure(message) => write!(f, "token signing failed: {message}"),
            Self::InvalidToken => write!(f, "invalid token"),
            Self::ExpiredToken => write!(f, "token expired"),
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::Forbidden(reason) => write!(f, "forbidden: {reason}"),
            Self::AccountCreatedWithoutSession { account_id } => write!(
                f,
                "account {account_id} was created but no session could be issued; please sign in"
            ),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageFailure(err) => Some(err),
            Self::InvalidInput(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidInput(err),
            RepoError::NotFound { entity, id } => Self::RecordNotFound { entity, id },
            RepoError::DuplicateAccount(identifier) => Self::DuplicateAccount(identifier),
            RepoError::Rejected(reason) => Self::Forbidden(reason),
            other => Self::StorageFailure(other),
        }
    }
}

impl From<TokenError> for CoreError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::InvalidToken | TokenError::WrongKind { .. } => Self::InvalidToken,
            TokenError::ExpiredToken => Self::ExpiredToken,
            TokenError::Configuration(message) => Self::Configuration(message),
            TokenError::Signing(message) => Self::TokenSigningFailure(message),
        }
    }
}

impl From<CredentialError> for CoreError {
    fn from(value: CredentialError) -> Self {
        match value {
            CredentialError::InvalidCredentials => Self::InvalidCredentials,
            CredentialError::Storage(err) => Self::from(err),
        }
    }
}

impl From<ConfigError> for CoreError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}

impl From<ValidationError> for CoreError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

/// Hashing only fails for an unusable cost setting.
impl From<PasswordError> for CoreError {
    fn from(value: PasswordError) -> Self {
        Self::Configuration(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreError, ErrorKind};
    use crate::auth::{CredentialError, TokenError, TokenKind};
    use crate::db::DbError;
    use crate::model::ValidationError;
    use crate::repo::RepoError;

    #[test]
    fn repo_errors_are_classified() {
        let duplicate = CoreError::from(RepoError::DuplicateAccount("amy".to_string()));
        assert_eq!(duplicate.kind(), ErrorKind::DuplicateAccount);

        let missing = CoreError::from(RepoError::NotFound {
            entity: "memo",
            id: 7,
        });
        assert_eq!(missing.kind(), ErrorKind::RecordNotFound);
        assert_eq!(missing.to_string(), "memo not found: 7");

        let storage = CoreError::from(RepoError::Db(DbError::Sqlite(
            rusqlite::Error::InvalidQuery,
        )));
        assert_eq!(storage.kind(), ErrorKind::StorageFailure);

        let invalid = CoreError::from(RepoError::Validation(ValidationError::Blank("title")));
        assert_eq!(invalid.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn token_kind_mismatch_reads_as_invalid_token() {
        let err = CoreError::from(TokenError::WrongKind {
            expected: TokenKind::Access,
            found: TokenKind::Refresh,
        });
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        assert_eq!(
            CoreError::from(TokenError::ExpiredToken).kind(),
            ErrorKind::ExpiredToken
        );
    }

    #[test]
    fn credential_storage_failure_keeps_its_class() {
        let err = CoreError::from(CredentialError::Storage(RepoError::InvalidData(
            "broken row".to_string(),
        )));
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert_eq!(
            CoreError::from(CredentialError::InvalidCredentials).kind(),
            ErrorKind::InvalidCredentials
        );
    }

    #[test]
    fn kind_codes_are_snake_case() {
        assert_eq!(ErrorKind::InvalidAdmissionCode.code(), "invalid_admission_code");
        assert_eq!(
            ErrorKind::AccountCreatedWithoutSession.code(),
            "account_created_without_session"
        );
    }
}
