//! Memo repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist author-supplied memo fields.
//! - Keep ownership filtering (`account_id`) inside SQL predicates.
//!
//! # Invariants
//! - No write path here touches `memos.rating`; the comment repository owns it.
//! - Lists are ordered `is_pinned DESC, created_at DESC, id DESC`.

use crate::model::account::{AccountId, RoomId};
use crate::model::memo::{BusinessInfo, GeoPoint, Memo, MemoDraft, MemoId, Rating};
use crate::repo::{bool_to_int, int_to_bool, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Rows};

const MEMO_SELECT_SQL: &str = "SELECT
    id,
    account_id,
    room_id,
    title,
    content,
    image_ref,
    rating,
    is_pinned,
    latitude,
    longitude,
    location_name,
    category,
    is_wishlist,
    business_name,
    business_phone,
    business_address,
    place_url,
    created_at,
    updated_at
FROM memos";

const MEMO_ORDER_SQL: &str = "ORDER BY is_pinned DESC, created_at DESC, id DESC";

/// Repository interface for memo operations.
pub trait MemoRepository {
    /// Inserts one memo into `room_id` and returns its id.
    fn create_memo(
        &self,
        account_id: AccountId,
        room_id: RoomId,
        draft: &MemoDraft,
    ) -> RepoResult<MemoId>;
    /// Loads one memo regardless of author.
    fn get_memo(&self, memo_id: MemoId) -> RepoResult<Option<Memo>>;
    /// Lists memos written by one account, optionally only wishlist (`true`)
    /// or only visited (`false`) places.
    fn list_by_account(
        &self,
        account_id: AccountId,
        wishlist: Option<bool>,
    ) -> RepoResult<Vec<Memo>>;
    /// Lists memos `account_id` wrote in one room.
    fn list_by_room(&self, account_id: AccountId, room_id: RoomId) -> RepoResult<Vec<Memo>>;
    /// Replaces author-editable fields of a memo owned by `account_id`.
    fn update_memo(
        &self,
        account_id: AccountId,
        memo_id: MemoId,
        draft: &MemoDraft,
    ) -> RepoResult<()>;
    /// Deletes a memo owned by `account_id`; comments cascade.
    fn delete_memo(&self, account_id: AccountId, memo_id: MemoId) -> RepoResult<()>;
    /// Returns whether `account_id` owns `room_id`.
    fn owns_room(&self, account_id: AccountId, room_id: RoomId) -> RepoResult<bool>;
    /// Returns the account's default room, `None` for an unknown account.
    fn default_room_id(&self, account_id: AccountId) -> RepoResult<Option<RoomId>>;
}

/// SQLite-backed memo repository.
pub struct SqliteMemoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemoRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MemoRepository for SqliteMemoRepository<'_> {
    fn create_memo(
        &self,
        account_id: AccountId,
        room_id: RoomId,
        draft: &MemoDraft,
    ) -> RepoResult<MemoId> {
        draft.validate()?;
        let (latitude, longitude) = split_location(draft.location.as_ref());

        self.conn.execute(
            "INSERT INTO memos (
                account_id,
                room_id,
                title,
                content,
                image_ref,
                is_pinned,
                latitude,
                longitude,
                location_name,
                category,
                is_wishlist,
                business_name,
                business_phone,
                business_address,
                place_url
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);",
            params![
                account_id,
                room_id,
                draft.title.trim(),
                draft.content.as_str(),
                draft.image_ref.as_deref(),
                bool_to_int(draft.is_pinned),
                latitude,
                longitude,
                draft.location_name.as_deref(),
                draft.category.as_deref(),
                bool_to_int(draft.is_wishlist),
                draft.business.name.as_deref(),
                draft.business.phone.as_deref(),
                draft.business.address.as_deref(),
                draft.business.place_url.as_deref(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_memo(&self, memo_id: MemoId) -> RepoResult<Option<Memo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMO_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([memo_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_memo_row(row)?));
        }
        Ok(None)
    }

    fn list_by_account(
        &self,
        account_id: AccountId,
        wishlist: Option<bool>,
    ) -> RepoResult<Vec<Memo>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMO_SELECT_SQL}
             WHERE account_id = ?1
               AND (?2 IS NULL OR is_wishlist = ?2)
             {MEMO_ORDER_SQL};"
        ))?;
        let rows = stmt.query(params![account_id, wishlist.map(bool_to_int)])?;
        collect_memos(rows)
    }

    fn list_by_room(&self, account_id: AccountId, room_id: RoomId) -> RepoResult<Vec<Memo>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMO_SELECT_SQL}
             WHERE room_id = ?1
               AND account_id = ?2
             {MEMO_ORDER_SQL};"
        ))?;
        let rows = stmt.query(params![room_id, account_id])?;
        collect_memos(rows)
    }

    fn update_memo(
        &self,
        account_id: AccountId,
        memo_id: MemoId,
        draft: &MemoDraft,
    ) -> RepoResult<()> {
        draft.validate()?;
        let (latitude, longitude) = split_location(draft.location.as_ref());

        let changed = self.conn.execute(
            "UPDATE memos
             SET
                room_id = COALESCE(?3, room_id),
                title = ?4,
                content = ?5,
                image_ref = ?6,
                is_pinned = ?7,
                latitude = ?8,
                longitude = ?9,
                location_name = ?10,
                category = ?11,
                is_wishlist = ?12,
                business_name = ?13,
                business_phone = ?14,
                business_address = ?15,
                place_url = ?16,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND account_id = ?2;",
            params![
                memo_id,
                account_id,
                draft.room_id,
                draft.title.trim(),
                draft.content.as_str(),
                draft.image_ref.as_deref(),
                bool_to_int(draft.is_pinned),
                latitude,
                longitude,
                draft.location_name.as_deref(),
                draft.category.as_deref(),
                bool_to_int(draft.is_wishlist),
                draft.business.name.as_deref(),
                draft.business.phone.as_deref(),
                draft.business.address.as_deref(),
                draft.business.place_url.as_deref(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "memo",
                id: memo_id,
            });
        }
        Ok(())
    }

    fn delete_memo(&self, account_id: AccountId, memo_id: MemoId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM memos WHERE id = ?1 AND account_id = ?2;",
            params![memo_id, account_id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "memo",
                id: memo_id,
            });
        }
        Ok(())
    }

    fn owns_room(&self, account_id: AccountId, room_id: RoomId) -> RepoResult<bool> {
        let owned: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM rooms WHERE id = ?1 AND owner_account_id = ?2;",
                params![room_id, account_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owned.is_some())
    }

    fn default_room_id(&self, account_id: AccountId) -> RepoResult<Option<RoomId>> {
        let room_id: Option<Option<RoomId>> = self
            .conn
            .query_row(
                "SELECT default_room_id FROM accounts WHERE id = ?1;",
                [account_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(room_id.flatten())
    }
}

fn collect_memos(mut rows: Rows<'_>) -> RepoResult<Vec<Memo>> {
    let mut memos = Vec::new();
    while let Some(row) = rows.next()? {
        memos.push(parse_memo_row(row)?);
    }
    Ok(memos)
}

fn split_location(location: Option<&GeoPoint>) -> (Option<f64>, Option<f64>) {
    match location {
        Some(point) => (Some(point.latitude), Some(point.longitude)),
        None => (None, None),
    }
}

fn parse_memo_row(row: &Row<'_>) -> RepoResult<Memo> {
    let rating_value: i64 = row.get("rating")?;
    let rating = Rating::new(rating_value).map_err(|_| {
        RepoError::InvalidData(format!("invalid rating `{rating_value}` in memos.rating"))
    })?;

    let latitude: Option<f64> = row.get("latitude")?;
    let longitude: Option<f64> = row.get("longitude")?;
    let location = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint {
            latitude,
            longitude,
        }),
        _ => None,
    };

    Ok(Memo {
        id: row.get("id")?,
        account_id: row.get("account_id")?,
        room_id: row.get("room_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        image_ref: row.get("image_ref")?,
        rating,
        is_pinned: int_to_bool("memos.is_pinned", row.get("is_pinned")?)?,
        location,
        location_name: row.get("location_name")?,
        category: row.get("category")?,
        is_wishlist: int_to_bool("memos.is_wishlist", row.get("is_wishlist")?)?,
        business: BusinessInfo {
            name: row.get("business_name")?,
            phone: row.get("business_phone")?,
            address: row.get("business_address")?,
            place_url: row.get("place_url")?,
        },
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
