//! Domain model for accounts, rooms, memos and comments.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own input validation rules shared by repositories and services.
//!
//! # Invariants
//! - Every persisted record is identified by a store-assigned `i64` id.
//! - A memo's `rating` is derived from its comments and never taken from input.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod account;
pub mod comment;
pub mod memo;

/// Input validation failure for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty after trimming.
    Blank(&'static str),
    /// Text field exceeds its character limit.
    TooLong { field: &'static str, max_chars: usize },
    /// Rating outside `0..=5`.
    RatingOutOfRange(i64),
    /// Latitude/longitude outside the valid range.
    CoordinateOutOfRange { field: &'static str, value: String },
    /// Phone number does not match the accepted pattern.
    InvalidPhone(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "`{field}` must not be blank"),
            Self::TooLong { field, max_chars } => {
                write!(f, "`{field}` exceeds maximum length of {max_chars} characters")
            }
            Self::RatingOutOfRange(value) => write!(f, "rating {value} is outside 0..=5"),
            Self::CoordinateOutOfRange { field, value } => {
                write!(f, "`{field}` value {value} is out of range")
            }
            Self::InvalidPhone(value) => write!(f, "invalid phone number `{value}`"),
        }
    }
}

impl Error for ValidationError {}

/// Rejects blank values and values longer than `max_chars`.
pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank(field));
    }
    limit_text(field, value, max_chars)
}

/// Rejects values longer than `max_chars`.
pub(crate) fn limit_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    Ok(())
}
