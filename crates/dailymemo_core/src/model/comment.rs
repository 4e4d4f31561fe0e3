//! Comment domain model.

use super::account::AccountId;
use super::memo::{MemoId, Rating};
use super::{require_text, ValidationError};
use serde::{Deserialize, Serialize};

/// Store-assigned comment id.
pub type CommentId = i64;

const CONTENT_MAX_CHARS: usize = 1000;

/// Persisted comment with its author's display name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub memo_id: MemoId,
    pub account_id: AccountId,
    /// Author display name, falling back to the account identifier.
    pub author_name: String,
    pub content: String,
    pub rating: Rating,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Comment input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub content: String,
    pub rating: Rating,
}

impl NewComment {
    pub fn new(content: impl Into<String>, rating: Rating) -> Self {
        Self {
            content: content.into(),
            rating,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("content", &self.content, CONTENT_MAX_CHARS)
    }
}
