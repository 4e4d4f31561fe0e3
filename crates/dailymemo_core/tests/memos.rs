use dailymemo_core::db::open_db_in_memory;
use dailymemo_core::{
    AuthContext, AuthService, BusinessInfo, CoreConfig, ErrorKind, GeoPoint, MemoDraft,
    MemoListFilter, MemoService, Rating, Session, SignUpRequest, SqliteAccountRepository,
    SqliteMemoRepository,
};
use rusqlite::Connection;

fn test_context() -> AuthContext {
    let mut config = CoreConfig::new("integration-secret-0123456789", "5508");
    config.password_hash_cost = 4;
    AuthContext::from_config(&config).unwrap()
}

fn sign_up(conn: &mut Connection, context: &AuthContext, identifier: &str) -> Session {
    AuthService::new(SqliteAccountRepository::new(conn), context)
        .sign_up(&SignUpRequest {
            identifier: identifier.to_string(),
            password: "pw-123456".to_string(),
            display_name: identifier.to_string(),
            admission_code: "5508".to_string(),
        })
        .unwrap()
}

#[test]
fn create_memo_defaults_to_default_room_with_zero_rating() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    let session = sign_up(&mut conn, &context, "amy");
    let service = MemoService::new(SqliteMemoRepository::new(&conn));

    let mut draft = MemoDraft::new("  Ramen place  ", "rich broth");
    draft.location = Some(GeoPoint {
        latitude: 37.5665,
        longitude: 126.978,
    });
    draft.location_name = Some("Seoul".to_string());
    draft.category = Some("food".to_string());
    draft.business = BusinessInfo {
        name: Some("Ramen House".to_string()),
        phone: Some("02-123-4567".to_string()),
        address: Some("1 Main St".to_string()),
        place_url: Some("https://place.example/1".to_string()),
    };

    let memo = service.create_memo(session.account_id, &draft).unwrap();
    assert_eq!(Some(memo.room_id), session.default_room_id);
    assert_eq!(memo.title, "Ramen place");
    assert_eq!(memo.rating, Rating::NONE);
    assert_eq!(memo.location, draft.location);
    assert_eq!(memo.business, draft.business);
    assert!(!memo.is_wishlist);
}

#[test]
fn memos_are_listed_pinned_first_then_newest_first() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    let session = sign_up(&mut conn, &context, "amy");
    let service = MemoService::new(SqliteMemoRepository::new(&conn));

    let first = service
        .create_memo(session.account_id, &MemoDraft::new("first", ""))
        .unwrap();
    let mut pinned = MemoDraft::new("pinned", "");
    pinned.is_pinned = true;
    let pinned = service.create_memo(session.account_id, &pinned).unwrap();
    let third = service
        .create_memo(session.account_id, &MemoDraft::new("third", ""))
        .unwrap();

    let ids: Vec<_> = service
        .list_memos(session.account_id, MemoListFilter::default())
        .unwrap()
        .into_iter()
        .map(|memo| memo.id)
        .collect();
    assert_eq!(ids, vec![pinned.id, third.id, first.id]);

    let room_ids: Vec<_> = service
        .list_room_memos(session.account_id, first.room_id)
        .unwrap()
        .into_iter()
        .map(|memo| memo.id)
        .collect();
    assert_eq!(room_ids, ids);
}

#[test]
fn wishlist_filter_splits_visited_and_wanted_places() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    let session = sign_up(&mut conn, &context, "amy");
    let service = MemoService::new(SqliteMemoRepository::new(&conn));

    let visited = service
        .create_memo(session.account_id, &MemoDraft::new("visited", ""))
        .unwrap();
    let mut wanted = MemoDraft::new("wanted", "");
    wanted.is_wishlist = true;
    let wanted = service.create_memo(session.account_id, &wanted).unwrap();

    let only_wishlist = service
        .list_memos(
            session.account_id,
            MemoListFilter {
                wishlist: Some(true),
            },
        )
        .unwrap();
    assert_eq!(only_wishlist.len(), 1);
    assert_eq!(only_wishlist[0].id, wanted.id);

    let only_visited = service
        .list_memos(
            session.account_id,
            MemoListFilter {
                wishlist: Some(false),
            },
        )
        .unwrap();
    assert_eq!(only_visited.len(), 1);
    assert_eq!(only_visited[0].id, visited.id);
}

#[test]
fn memos_of_other_accounts_are_invisible_and_immutable() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    let amy = sign_up(&mut conn, &context, "amy");
    let bo = sign_up(&mut conn, &context, "bo");
    let service = MemoService::new(SqliteMemoRepository::new(&conn));

    let memo = service
        .create_memo(amy.account_id, &MemoDraft::new("private", ""))
        .unwrap();

    assert_eq!(
        service.get_memo(bo.account_id, memo.id).unwrap_err().kind(),
        ErrorKind::RecordNotFound
    );
    assert_eq!(
        service
            .update_memo(bo.account_id, memo.id, &MemoDraft::new("hijack", ""))
            .unwrap_err()
            .kind(),
        ErrorKind::RecordNotFound
    );
    assert_eq!(
        service.delete_memo(bo.account_id, memo.id).unwrap_err().kind(),
        ErrorKind::RecordNotFound
    );
    assert!(service
        .list_memos(bo.account_id, MemoListFilter::default())
        .unwrap()
        .is_empty());
    assert_eq!(service.get_memo(amy.account_id, memo.id).unwrap().title, "private");
}

#[test]
fn memo_cannot_target_a_foreign_room() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    let amy = sign_up(&mut conn, &context, "amy");
    let bo = sign_up(&mut conn, &context, "bo");
    let service = MemoService::new(SqliteMemoRepository::new(&conn));

    let mut draft = MemoDraft::new("intruder", "");
    draft.room_id = bo.default_room_id;
    assert_eq!(
        service.create_memo(amy.account_id, &draft).unwrap_err().kind(),
        ErrorKind::Forbidden
    );

    let memo = service
        .create_memo(amy.account_id, &MemoDraft::new("mine", ""))
        .unwrap();
    assert_eq!(
        service
            .update_memo(amy.account_id, memo.id, &draft)
            .unwrap_err()
            .kind(),
        ErrorKind::Forbidden
    );
}

#[test]
fn room_listing_is_limited_to_the_room_owner() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    let amy = sign_up(&mut conn, &context, "amy");
    let bo = sign_up(&mut conn, &context, "bo");
    let service = MemoService::new(SqliteMemoRepository::new(&conn));

    let memo = service
        .create_memo(amy.account_id, &MemoDraft::new("amy private", ""))
        .unwrap();

    assert_eq!(
        service
            .list_room_memos(bo.account_id, memo.room_id)
            .unwrap_err()
            .kind(),
        ErrorKind::Forbidden
    );
    let titles: Vec<_> = service
        .list_room_memos(amy.account_id, memo.room_id)
        .unwrap()
        .into_iter()
        .map(|memo| memo.title)
        .collect();
    assert_eq!(titles, vec!["amy private"]);
}

#[test]
fn update_replaces_fields_but_keeps_rating() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    let session = sign_up(&mut conn, &context, "amy");
    let service = MemoService::new(SqliteMemoRepository::new(&conn));

    let memo = service
        .create_memo(session.account_id, &MemoDraft::new("draft", "old"))
        .unwrap();
    conn.execute("UPDATE memos SET rating = 4 WHERE id = ?1;", [memo.id])
        .unwrap();

    let mut update = MemoDraft::new("final", "new");
    update.is_pinned = true;
    let updated = service
        .update_memo(session.account_id, memo.id, &update)
        .unwrap();

    assert_eq!(updated.title, "final");
    assert_eq!(updated.content, "new");
    assert!(updated.is_pinned);
    assert_eq!(updated.room_id, memo.room_id);
    assert_eq!(updated.rating, Rating::new(4).unwrap());
}

#[test]
fn invalid_memo_input_is_rejected_before_writing() {
    let context = test_context();
    let mut conn = open_db_in_memory().unwrap();
    let session = sign_up(&mut conn, &context, "amy");
    let service = MemoService::new(SqliteMemoRepository::new(&conn));

    let blank = MemoDraft::new("   ", "body");
    let mut bad_phone = MemoDraft::new("title", "");
    bad_phone.business.phone = Some("call me".to_string());
    let mut bad_latitude = MemoDraft::new("title", "");
    bad_latitude.location = Some(GeoPoint {
        latitude: 91.0,
        longitude: 0.0,
    });
    let long_title = MemoDraft::new("t".repeat(201), "");

    for draft in [blank, bad_phone, bad_latitude, long_title] {
        assert_eq!(
            service
                .create_memo(session.account_id, &draft)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidInput
        );
    }
    assert!(service
        .list_memos(session.account_id, MemoListFilter::default())
        .unwrap()
        .is_empty());
}
