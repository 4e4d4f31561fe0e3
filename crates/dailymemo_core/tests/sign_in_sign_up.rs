use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dailymemo_core::auth::TokenError;
use dailymemo_core::db::{open_db, open_db_in_memory, DbOptions};
use dailymemo_core::repo::account_repo::AccountRepository;
use dailymemo_core::{
    AuthContext, AuthService, CoreConfig, CoreError, ErrorKind, Session, SignUpRequest,
    SqliteAccountRepository, TokenKind,
};
use rusqlite::Connection;
use std::sync::Barrier;
use std::time::Duration;

const ADMISSION_CODE: &str = "5508";

fn test_context() -> AuthContext {
    let mut config = CoreConfig::new("integration-secret-0123456789", ADMISSION_CODE);
    config.password_hash_cost = 4;
    AuthContext::from_config(&config).unwrap()
}

fn request(identifier: &str, password: &str, display_name: &str) -> SignUpRequest {
    SignUpRequest {
        identifier: identifier.to_string(),
        password: password.to_string(),
        display_name: display_name.to_string(),
        admission_code: ADMISSION_CODE.to_string(),
    }
}

fn sign_up(conn: &mut Connection, context: &AuthContext, identifier: &str) -> Session {
    AuthService::new(SqliteAccountRepository::new(conn), context)
        .sign_up(&request(identifier, "pw-123456", "Amy"))
        .unwrap()
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn sign_up_creates_account_with_owned_default_room() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();

    let session = sign_up(&mut conn, &context, "amy");
    let room_id = session.default_room_id.expect("default room is set");

    let repo = SqliteAccountRepository::new(&mut conn);
    let account = repo.get_account(session.account_id).unwrap().unwrap();
    let room = repo.get_room(room_id).unwrap().unwrap();
    assert_eq!(account.default_room_id, Some(room_id));
    assert_eq!(room.owner_account_id, account.id);
    assert_eq!(room.name, "Amy's room");
    assert!(account.secret.starts_with("$2"), "secret must be a bcrypt hash");
    assert_ne!(account.secret, "pw-123456");
}

#[test]
fn sign_up_with_wrong_admission_code_writes_nothing() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();

    let mut wrong = request("amy", "pw-123456", "Amy");
    wrong.admission_code = "0000".to_string();
    let err = AuthService::new(SqliteAccountRepository::new(&mut conn), &context)
        .sign_up(&wrong)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidAdmissionCode);
    assert_eq!(count(&conn, "accounts"), 0);
    assert_eq!(count(&conn, "rooms"), 0);
}

#[test]
fn sign_up_keeps_account_when_session_cannot_be_issued() {
    let context = test_context();
    let stopped_clock = test_context().with_clock(|| DateTime::<Utc>::MAX_UTC);
    let mut conn = open_db_in_memory().unwrap();

    let err = AuthService::new(SqliteAccountRepository::new(&mut conn), &stopped_clock)
        .sign_up(&request("amy", "pw-123456", "Amy"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccountCreatedWithoutSession);
    assert_eq!(count(&conn, "accounts"), 1);
    assert_eq!(count(&conn, "rooms"), 1);

    let session = AuthService::new(SqliteAccountRepository::new(&mut conn), &context)
        .sign_in("amy", "pw-123456")
        .unwrap();
    assert!(session.default_room_id.is_some());
    assert!(matches!(
        err,
        CoreError::AccountCreatedWithoutSession { account_id }
            if account_id == session.account_id
    ));
}

#[test]
fn sign_up_with_invalid_input_writes_nothing() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();

    let err = AuthService::new(SqliteAccountRepository::new(&mut conn), &context)
        .sign_up(&request("   ", "pw-123456", "Amy"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(count(&conn, "accounts"), 0);
}

#[test]
fn sign_up_with_existing_identifier_never_creates_second_account() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    sign_up(&mut conn, &context, "amy");

    let err = AuthService::new(SqliteAccountRepository::new(&mut conn), &context)
        .sign_up(&request("amy", "other-password", "Another Amy"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DuplicateAccount);
    assert_eq!(count(&conn, "accounts"), 1);
    assert_eq!(count(&conn, "rooms"), 1);
}

#[test]
fn wrong_password_and_unknown_identifier_fail_the_same_way() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    sign_up(&mut conn, &context, "amy");

    let service = AuthService::new(SqliteAccountRepository::new(&mut conn), &context);
    let wrong_password = service.sign_in("amy", "not-the-password").unwrap_err();
    let unknown = service.sign_in("nobody", "pw-123456").unwrap_err();

    assert_eq!(wrong_password.kind(), ErrorKind::InvalidCredentials);
    assert_eq!(unknown.kind(), wrong_password.kind());
    assert_eq!(unknown.to_string(), wrong_password.to_string());
}

#[test]
fn sign_in_issues_verifiable_token_pair() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    let created = sign_up(&mut conn, &context, "amy");

    let service = AuthService::new(SqliteAccountRepository::new(&mut conn), &context);
    let session = service.sign_in(" amy ", "pw-123456").unwrap();

    assert_eq!(session.account_id, created.account_id);
    assert_eq!(session.default_room_id, created.default_room_id);
    assert!(session.tokens.access_token_expires_at < session.tokens.refresh_token_expires_at);

    let claims = context.authenticate(&session.tokens.access_token).unwrap();
    assert_eq!(claims.account_id().unwrap(), created.account_id);
    assert_eq!(claims.aid, "amy");
    assert_eq!(claims.typ, TokenKind::Access);
}

#[test]
fn tokens_expire_against_simulated_clock() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    let session = sign_up(&mut conn, &context, "amy");
    let issuer = context.issuer();

    let access_expiry =
        DateTime::from_timestamp_millis(session.tokens.access_token_expires_at).unwrap();
    let after_access = access_expiry + ChronoDuration::seconds(1);
    assert_eq!(
        issuer
            .verify_at(&session.tokens.access_token, TokenKind::Access, after_access)
            .unwrap_err(),
        TokenError::ExpiredToken
    );
    // The refresh token outlives the access token.
    issuer
        .verify_at(&session.tokens.refresh_token, TokenKind::Refresh, after_access)
        .unwrap();

    let after_refresh = Utc::now() + ChronoDuration::days(8);
    assert_eq!(
        issuer
            .verify_at(&session.tokens.refresh_token, TokenKind::Refresh, after_refresh)
            .unwrap_err(),
        TokenError::ExpiredToken
    );
}

#[test]
fn refresh_session_accepts_only_refresh_tokens() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    let session = sign_up(&mut conn, &context, "amy");

    let service = AuthService::new(SqliteAccountRepository::new(&mut conn), &context);
    let refreshed = service
        .refresh_session(&session.tokens.refresh_token)
        .unwrap();
    assert_eq!(refreshed.account_id, session.account_id);
    context.authenticate(&refreshed.tokens.access_token).unwrap();

    let err = service
        .refresh_session(&session.tokens.access_token)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidToken);

    let tampered = format!("{}x", session.tokens.refresh_token);
    assert_eq!(
        service.refresh_session(&tampered).unwrap_err().kind(),
        ErrorKind::InvalidToken
    );
}

#[test]
fn concurrent_sign_up_with_same_identifier_creates_exactly_one_account() {
    let context = test_context();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    let options = DbOptions {
        busy_timeout: Duration::from_secs(10),
    };
    drop(open_db(&path, options).unwrap());

    let contenders = 4;
    let barrier = Barrier::new(contenders);
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..contenders)
            .map(|index| {
                let barrier = &barrier;
                let context = &context;
                let path = &path;
                scope.spawn(move || {
                    let mut conn = open_db(path, options).unwrap();
                    let mut service =
                        AuthService::new(SqliteAccountRepository::new(&mut conn), context);
                    barrier.wait();
                    service
                        .sign_up(&request("amy", "pw-123456", &format!("Amy {index}")))
                        .map_err(|err| err.kind())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let successes = results.iter().filter(|result| result.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|result| matches!(result, Err(ErrorKind::DuplicateAccount)))
        .count();
    assert_eq!(successes, 1, "results: {results:?}");
    assert_eq!(duplicates, contenders - 1, "results: {results:?}");

    let conn = open_db(&path, options).unwrap();
    assert_eq!(count(&conn, "accounts"), 1);
    assert_eq!(count(&conn, "rooms"), 1);
}
