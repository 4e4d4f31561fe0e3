//! Memo domain model and input validation.
//!
//! # Invariants
//! - `rating` equals the rounded mean of the memo's nonzero comment ratings,
//!   or 0 when there are none. Only the rating aggregator writes it.
//! - `title` is never blank.

use super::account::{AccountId, RoomId};
use super::{limit_text, require_text, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Store-assigned memo id.
pub type MemoId = i64;

const TITLE_MAX_CHARS: usize = 200;
const IMAGE_REF_MAX_CHARS: usize = 500;
const LOCATION_NAME_MAX_CHARS: usize = 255;
const CATEGORY_MAX_CHARS: usize = 50;
const BUSINESS_NAME_MAX_CHARS: usize = 255;
const BUSINESS_ADDRESS_MAX_CHARS: usize = 1000;
const PLACE_URL_MAX_CHARS: usize = 500;

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+]?[(]?[0-9]{1,4}[)]?[-\s.]?[(]?[0-9]{1,4}[)]?[-\s.]?[0-9]{1,9}$")
        .expect("valid phone regex")
});

/// Score in `0..=5`. Zero means "no opinion" for comments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 5;
    pub const NONE: Rating = Rating(0);

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        match u8::try_from(value) {
            Ok(score) if score <= Self::MAX => Ok(Self(score)),
            _ => Err(ValidationError::RatingOutOfRange(value)),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Rounded mean of nonzero ratings, half rounding up; zero when empty.
    ///
    /// The store computes `memos.rating` in SQL with the same integer
    /// formula. This is the in-memory reference that statement is checked
    /// against.
    pub fn aggregate(ratings: impl IntoIterator<Item = Rating>) -> Rating {
        let (sum, count) = ratings
            .into_iter()
            .filter(|rating| rating.0 > 0)
            .fold((0u32, 0u32), |(sum, count), rating| {
                (sum + u32::from(rating.0), count + 1)
            });
        if count == 0 {
            return Rating::NONE;
        }
        // (2 * sum + count) / (2 * count) == floor(sum / count + 0.5)
        let rounded = (2 * sum + count) / (2 * count);
        Rating(rounded.min(u32::from(Self::MAX)) as u8)
    }
}

impl TryFrom<i64> for Rating {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(value: Rating) -> Self {
        i64::from(value.0)
    }
}

/// Geographic pin for a memo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Optional place/business details attached to a memo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// External place page (map provider link).
    pub place_url: Option<String>,
}

impl BusinessInfo {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = self.name.as_deref() {
            limit_text("business_name", name, BUSINESS_NAME_MAX_CHARS)?;
        }
        if let Some(phone) = self.phone.as_deref() {
            if !phone.is_empty() && !PHONE_RE.is_match(phone) {
                return Err(ValidationError::InvalidPhone(phone.to_string()));
            }
        }
        if let Some(address) = self.address.as_deref() {
            limit_text("business_address", address, BUSINESS_ADDRESS_MAX_CHARS)?;
        }
        if let Some(url) = self.place_url.as_deref() {
            limit_text("place_url", url, PLACE_URL_MAX_CHARS)?;
        }
        Ok(())
    }
}

/// Persisted memo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memo {
    pub id: MemoId,
    pub account_id: AccountId,
    pub room_id: RoomId,
    pub title: String,
    pub content: String,
    pub image_ref: Option<String>,
    /// Derived from comments.
    pub rating: Rating,
    pub is_pinned: bool,
    pub location: Option<GeoPoint>,
    pub location_name: Option<String>,
    pub category: Option<String>,
    /// `true` for places the author wants to visit, `false` for visited ones.
    pub is_wishlist: bool,
    pub business: BusinessInfo,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Memo fields supplied by the author. Used for both create and full update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoDraft {
    /// Target room. `None` means the author's default room (create only).
    pub room_id: Option<RoomId>,
    pub title: String,
    pub content: String,
    pub image_ref: Option<String>,
    pub is_pinned: bool,
    pub location: Option<GeoPoint>,
    pub location_name: Option<String>,
    pub category: Option<String>,
    pub is_wishlist: bool,
    pub business: BusinessInfo,
}

impl MemoDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, TITLE_MAX_CHARS)?;
        if let Some(image) = self.image_ref.as_deref() {
            limit_text("image_ref", image, IMAGE_REF_MAX_CHARS)?;
        }
        if let Some(point) = self.location.as_ref() {
            validate_coordinate("latitude", point.latitude, 90.0)?;
            validate_coordinate("longitude", point.longitude, 180.0)?;
        }
        if let Some(name) = self.location_name.as_deref() {
            limit_text("location_name", name, LOCATION_NAME_MAX_CHARS)?;
        }
        if let Some(category) = self.category.as_deref() {
            limit_text("category", category, CATEGORY_MAX_CHARS)?;
        }
        self.business.validate()
    }
}

fn validate_coordinate(field: &'static str, value: f64, bound: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (-bound..=bound).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::CoordinateOutOfRange {
            field,
            value: value.to_string(),
        })
    }
}
