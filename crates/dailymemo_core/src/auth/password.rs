//! Password hashing with bcrypt.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Hashing backend failure (bad cost, malformed stored hash).
#[derive(Debug)]
pub struct PasswordError(bcrypt::BcryptError);

impl Display for PasswordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "password hashing failed: {}", self.0)
    }
}

impl Error for PasswordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

/// Hashes `password` with a fresh salt at the given bcrypt cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    bcrypt::hash(password, cost).map_err(PasswordError)
}

/// Checks `password` against a stored bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, hash).map_err(PasswordError)
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password};

    #[test]
    fn hash_is_salted_and_verifies() {
        let first = hash_password("s3cret", 4).unwrap();
        let second = hash_password("s3cret", 4).unwrap();
        assert_ne!(first, second);
        assert!(verify_password("s3cret", &first).unwrap());
        assert!(!verify_password("wrong", &first).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("s3cret", "plaintext").is_err());
    }
}
