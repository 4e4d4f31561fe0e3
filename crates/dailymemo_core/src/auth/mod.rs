//! Credential checks and stateless session tokens.
//!
//! # Responsibility
//! - Hash and verify password secrets.
//! - Resolve an account from an identifier/password assertion.
//! - Issue and verify HMAC-signed access/refresh token pairs.
//!
//! # Invariants
//! - Passwords are stored only as salted one-way hashes.
//! - Token issuance and verification never touch the store.

pub mod credential;
pub mod password;
pub mod token;

pub use credential::{CredentialError, CredentialVerifier};
pub use token::{Claims, TokenError, TokenIssuer, TokenKind, TokenPair};
