//! Comment repository and memo rating aggregation.
//!
//! # Responsibility
//! - Persist comments and keep `memos.rating` consistent with them.
//!
//! # Invariants
//! - `memos.rating` is recomputed by one aggregate-and-update statement, so a
//!   recomputation never mixes two snapshots of the comment set.
//! - Comment insert/delete and the recomputation share one immediate
//!   transaction; concurrent writers on the same memo are serialized by the
//!   store's write lock.
//! - Recomputing a memo that no longer exists is a successful no-op.

use crate::db::with_transaction;
use crate::model::account::AccountId;
use crate::model::comment::{Comment, CommentId, NewComment};
use crate::model::memo::{MemoId, Rating};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Rounded mean of nonzero comment ratings, half up, in integer arithmetic:
/// `floor(sum / n + 1/2) == (2 * sum + n) / (2 * n)`. Yields 0 when there are
/// no nonzero ratings (`SUM` is NULL).
/// SQL form of [`Rating::aggregate`] over the memo's comments.
const RECOMPUTE_RATING_SQL: &str = "UPDATE memos
SET rating = COALESCE(
    (SELECT (2 * SUM(c.rating) + COUNT(*)) / (2 * COUNT(*))
     FROM comments c
     WHERE c.memo_id = ?1
       AND c.rating > 0),
    0
)
WHERE id = ?1;";

/// Repository interface for comment operations.
pub trait CommentRepository {
    /// Inserts a comment and refreshes the memo rating in one transaction.
    fn create_comment(
        &mut self,
        memo_id: MemoId,
        account_id: AccountId,
        comment: &NewComment,
    ) -> RepoResult<CommentId>;
    /// Deletes the author's own comment and refreshes the memo rating in one
    /// transaction. Returns the memo the comment belonged to.
    fn delete_comment(&mut self, comment_id: CommentId, account_id: AccountId)
        -> RepoResult<MemoId>;
    /// Loads one comment.
    fn get_comment(&self, comment_id: CommentId) -> RepoResult<Option<Comment>>;
    /// Lists comments on a memo, newest first.
    fn list_by_memo(&self, memo_id: MemoId) -> RepoResult<Vec<Comment>>;
    /// Recomputes the derived rating of one memo.
    ///
    /// Returns `false` when the memo does not exist (nothing to update).
    fn recompute_memo_rating(&self, memo_id: MemoId) -> RepoResult<bool>;
}

/// SQLite-backed comment repository.
pub struct SqliteCommentRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteCommentRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl CommentRepository for SqliteCommentRepository<'_> {
    fn create_comment(
        &mut self,
        memo_id: MemoId,
        account_id: AccountId,
        comment: &NewComment,
    ) -> RepoResult<CommentId> {
        comment.validate()?;

        with_transaction(self.conn, |tx| {
            let memo_exists: Option<i64> = tx
                .query_row("SELECT 1 FROM memos WHERE id = ?1;", [memo_id], |row| {
                    row.get(0)
                })
                .optional()?;
            if memo_exists.is_none() {
                return Err(RepoError::NotFound {
                    entity: "memo",
                    id: memo_id,
                });
            }

            tx.execute(
                "INSERT INTO comments (memo_id, account_id, content, rating)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    memo_id,
                    account_id,
                    comment.content.trim(),
                    i64::from(comment.rating),
                ],
            )?;
            let comment_id = tx.last_insert_rowid();

            tx.execute(RECOMPUTE_RATING_SQL, [memo_id])?;
            Ok(comment_id)
        })
    }

    fn delete_comment(
        &mut self,
        comment_id: CommentId,
        account_id: AccountId,
    ) -> RepoResult<MemoId> {
        with_transaction(self.conn, |tx| {
            let memo_id: MemoId = tx
                .query_row(
                    "SELECT memo_id FROM comments WHERE id = ?1 AND account_id = ?2;",
                    params![comment_id, account_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(RepoError::NotFound {
                    entity: "comment",
                    id: comment_id,
                })?;

            tx.execute("DELETE FROM comments WHERE id = ?1;", [comment_id])?;
            tx.execute(RECOMPUTE_RATING_SQL, [memo_id])?;
            Ok(memo_id)
        })
    }

    fn get_comment(&self, comment_id: CommentId) -> RepoResult<Option<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.memo_id, c.account_id, c.content, c.rating, c.created_at,
                    COALESCE(NULLIF(a.display_name, ''), a.identifier) AS author_name
             FROM comments c
             INNER JOIN accounts a ON a.id = c.account_id
             WHERE c.id = ?1;",
        )?;
        let mut rows = stmt.query([comment_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_comment_row(row)?));
        }
        Ok(None)
    }

    fn list_by_memo(&self, memo_id: MemoId) -> RepoResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.memo_id, c.account_id, c.content, c.rating, c.created_at,
                    COALESCE(NULLIF(a.display_name, ''), a.identifier) AS author_name
             FROM comments c
             INNER JOIN accounts a ON a.id = c.account_id
             WHERE c.memo_id = ?1
             ORDER BY c.created_at DESC, c.id DESC;",
        )?;
        let mut rows = stmt.query([memo_id])?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            comments.push(parse_comment_row(row)?);
        }
        Ok(comments)
    }

    fn recompute_memo_rating(&self, memo_id: MemoId) -> RepoResult<bool> {
        let changed = self.conn.execute(RECOMPUTE_RATING_SQL, [memo_id])?;
        Ok(changed > 0)
    }
}

fn parse_comment_row(row: &Row<'_>) -> RepoResult<Comment> {
    let rating_value: i64 = row.get("rating")?;
    let rating = Rating::new(rating_value).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid rating `{rating_value}` in comments.rating"
        ))
    })?;

    Ok(Comment {
        id: row.get("id")?,
        memo_id: row.get("memo_id")?,
        account_id: row.get("account_id")?,
        author_name: row.get("author_name")?,
        content: row.get("content")?,
        rating,
        created_at: row.get("created_at")?,
    })
}
