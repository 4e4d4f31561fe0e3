//! Comment use-cases and memo rating maintenance.
//!
//! # Invariants
//! - Creating or deleting a comment is the only way a memo rating changes,
//!   and the change commits together with the comment write.
//! - Only the author can delete a comment; a foreign comment reads as
//!   missing.

use crate::error::{CoreError, CoreResult};
use crate::model::account::AccountId;
use crate::model::comment::{Comment, CommentId, NewComment};
use crate::model::memo::{MemoId, Rating};
use crate::repo::comment_repo::CommentRepository;
use log::{info, warn};

pub struct CommentService<R: CommentRepository> {
    repo: R,
}

impl<R: CommentRepository> CommentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Adds a rated comment to a memo and returns it with the author name.
    pub fn create_comment(
        &mut self,
        account_id: AccountId,
        memo_id: MemoId,
        content: &str,
        rating: i64,
    ) -> CoreResult<Comment> {
        let comment = NewComment::new(content, Rating::new(rating)?);
        let comment_id = self
            .repo
            .create_comment(memo_id, account_id, &comment)
            .map_err(|err| {
                let err = CoreError::from(err);
                warn!(
                    "event=comment_create module=comment status=error memo_id={} error_code={}",
                    memo_id,
                    err.kind().code()
                );
                err
            })?;
        info!(
            "event=comment_create module=comment status=ok memo_id={} comment_id={} rating={}",
            memo_id,
            comment_id,
            comment.rating.value()
        );

        self.repo
            .get_comment(comment_id)?
            .ok_or(CoreError::RecordNotFound {
                entity: "comment",
                id: comment_id,
            })
    }

    /// Deletes the author's comment and returns the memo it was attached to.
    pub fn delete_comment(&mut self, account_id: AccountId, comment_id: CommentId) -> CoreResult<MemoId> {
        match self.repo.delete_comment(comment_id, account_id) {
            Ok(memo_id) => {
                info!(
                    "event=comment_delete module=comment status=ok memo_id={} comment_id={}",
                    memo_id, comment_id
                );
                Ok(memo_id)
            }
            Err(err) => {
                let err = CoreError::from(err);
                warn!(
                    "event=comment_delete module=comment status=error comment_id={} error_code={}",
                    comment_id,
                    err.kind().code()
                );
                Err(err)
            }
        }
    }

    /// Lists comments on a memo, newest first.
    pub fn list_comments(&self, memo_id: MemoId) -> CoreResult<Vec<Comment>> {
        Ok(self.repo.list_by_memo(memo_id)?)
    }

    /// Recomputes a memo's rating from its live comments.
    ///
    /// A memo deleted in the meantime is a successful no-op.
    pub fn recompute_memo_rating(&self, memo_id: MemoId) -> CoreResult<()> {
        let updated = self.repo.recompute_memo_rating(memo_id)?;
        if updated {
            info!("event=rating_recompute module=comment status=ok memo_id={memo_id}");
        } else {
            info!("event=rating_recompute module=comment status=noop memo_id={memo_id}");
        }
        Ok(())
    }
}
