//! Stateless access/refresh token issuance and verification.
//!
//! # Responsibility
//! - Sign HS256 JWTs carrying account id, identifier, token kind and expiry.
//! - Verify signature, algorithm, kind and expiry against a supplied instant.
//!
//! # Invariants
//! - The signing secret comes from `CoreConfig` at construction and is never
//!   mutated afterwards.
//! - Access expiry is strictly earlier than refresh expiry for one pair.
//! - Expiry is checked by this module (not by the JWT library) so callers can
//!   verify against a simulated clock.

use crate::config::{CoreConfig, MAX_TOKEN_TTL};
use crate::model::account::AccountId;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Token verification or issuance failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, wrong algorithm, malformed token or claims.
    InvalidToken,
    /// Token was valid but its expiry is not after the verification instant.
    ExpiredToken,
    /// A refresh token was presented where an access token is required, or
    /// the reverse.
    WrongKind { expected: TokenKind, found: TokenKind },
    /// The issuer cannot be built: no usable secret or TTLs.
    Configuration(String),
    /// The JWT backend failed to sign.
    Signing(String),
}

impl Display for TokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "invalid token"),
            Self::ExpiredToken => write!(f, "token expired"),
            Self::WrongKind { expected, found } => {
                write!(f, "expected {expected} token, got {found} token")
            }
            Self::Configuration(message) => write!(f, "token issuer misconfigured: {message}"),
            Self::Signing(message) => write!(f, "failed to sign token: {message}"),
        }
    }
}

impl Error for TokenError {}

/// Purpose of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT claims embedded in both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric account id rendered as a string.
    pub sub: String,
    /// Account sign-in identifier.
    pub aid: String,
    pub typ: TokenKind,
    /// Issued-at, epoch seconds.
    pub iat: i64,
    /// Expiry, epoch seconds.
    pub exp: i64,
}

impl Claims {
    /// Parses `sub` back into an account id.
    pub fn account_id(&self) -> Result<AccountId, TokenError> {
        self.sub.parse().map_err(|_| TokenError::InvalidToken)
    }
}

/// Issued token pair. Expiries are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(rename = "access_token_expired_at")]
    pub access_token_expires_at: i64,
    pub refresh_token: String,
    #[serde(rename = "refresh_token_expired_at")]
    pub refresh_token_expires_at: i64,
}

/// HS256 token issuer/verifier.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Builds an issuer from process configuration.
    pub fn from_config(config: &CoreConfig) -> Result<Self, TokenError> {
        Self::new(
            config.token_secret.as_bytes(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        )
    }

    /// Builds an issuer from raw settings.
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Configuration("token secret is empty".to_string()));
        }
        let access_ttl_secs = ttl_secs(access_ttl)?;
        let refresh_ttl_secs = ttl_secs(refresh_ttl)?;
        if refresh_ttl_secs <= access_ttl_secs {
            return Err(TokenError::Configuration(
                "refresh ttl must exceed access ttl".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
            refresh_ttl_secs,
        })
    }

    /// Issues a token pair valid from `now`.
    pub fn issue_token_pair_at(
        &self,
        account_id: AccountId,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        let (access_token, access_exp) =
            self.sign(account_id, identifier, TokenKind::Access, now)?;
        let (refresh_token, refresh_exp) =
            self.sign(account_id, identifier, TokenKind::Refresh, now)?;

        Ok(TokenPair {
            access_token,
            access_token_expires_at: epoch_millis(access_exp)?,
            refresh_token,
            refresh_token_expires_at: epoch_millis(refresh_exp)?,
        })
    }

    /// Verifies signature, algorithm, kind and expiry of `token` at `now`.
    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
                _ => TokenError::InvalidToken,
            })?
            .claims;

        if claims.typ != expected {
            return Err(TokenError::WrongKind {
                expected,
                found: claims.typ,
            });
        }
        if now.timestamp() >= claims.exp {
            return Err(TokenError::ExpiredToken);
        }
        claims.account_id()?;
        Ok(claims)
    }

    fn sign(
        &self,
        account_id: AccountId,
        identifier: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<(String, i64), TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let expires_at = TimeDelta::try_seconds(ttl)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                TokenError::Signing(format!("{kind} token expiry is out of range"))
            })?;
        let claims = Claims {
            sub: account_id.to_string(),
            aid: identifier.to_string(),
            typ: kind,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| TokenError::Signing(err.to_string()))?;
        Ok((token, claims.exp))
    }
}

fn epoch_millis(secs: i64) -> Result<i64, TokenError> {
    secs.checked_mul(1000)
        .ok_or_else(|| TokenError::Signing("token expiry is out of range".to_string()))
}

fn ttl_secs(ttl: Duration) -> Result<i64, TokenError> {
    match i64::try_from(ttl.as_secs()) {
        Ok(secs) if secs > 0 && ttl <= MAX_TOKEN_TTL => Ok(secs),
        _ => Err(TokenError::Configuration(format!(
            "token ttl {}s is out of range",
            ttl.as_secs()
        ))),
    }
}
