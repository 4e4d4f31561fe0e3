//! Core domain logic for DailyMemo.
//! Accounts, rooms, memos and rated comments over SQLite, plus sign-in/sign-up
//! session issuance. Transport layers call into this crate and nothing else.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::{Claims, CredentialVerifier, TokenIssuer, TokenKind, TokenPair};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbOptions};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::account::{Account, AccountId, NewAccount, ProfileUpdate, Room, RoomId};
pub use model::comment::{Comment, CommentId};
pub use model::memo::{BusinessInfo, GeoPoint, Memo, MemoDraft, MemoId, Rating};
pub use repo::account_repo::{AccountRepository, ProvisionedAccount, SqliteAccountRepository};
pub use repo::comment_repo::{CommentRepository, SqliteCommentRepository};
pub use repo::memo_repo::{MemoRepository, SqliteMemoRepository};
pub use service::auth_service::{AuthContext, AuthService, Session, SignUpRequest};
pub use service::comment_service::CommentService;
pub use service::memo_service::{MemoListFilter, MemoService};
pub use service::profile_service::ProfileService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
