//! Account and room domain model.
//!
//! # Invariants
//! - `identifier` is unique across accounts.
//! - After provisioning commits, `default_room_id` points at a room owned by
//!   the same account.
//! - `secret` holds a one-way password hash, never the plain password.

use super::{limit_text, require_text, ValidationError};
use serde::{Deserialize, Serialize};

/// Store-assigned account id.
pub type AccountId = i64;

/// Store-assigned room id.
pub type RoomId = i64;

const IDENTIFIER_MAX_CHARS: usize = 255;
const DISPLAY_NAME_MAX_CHARS: usize = 100;
const AVATAR_REF_MAX_CHARS: usize = 500;

/// Registered user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Sign-in name chosen by the user.
    pub identifier: String,
    /// Password hash. Skipped on serialization so it never reaches a client.
    #[serde(skip_serializing, default)]
    pub secret: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub default_room_id: Option<RoomId>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Named memo container owned by one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    /// Opaque unique code used to share the room.
    pub code: String,
    pub name: String,
    pub owner_account_id: AccountId,
}

/// Sign-up input after the admission gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub identifier: String,
    pub password: String,
    pub display_name: String,
}

impl NewAccount {
    pub fn new(
        identifier: impl Into<String>,
        password: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            password: password.into(),
            display_name: display_name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("identifier", &self.identifier, IDENTIFIER_MAX_CHARS)?;
        if self.password.is_empty() {
            return Err(ValidationError::Blank("password"));
        }
        require_text("display_name", &self.display_name, DISPLAY_NAME_MAX_CHARS)
    }

    /// Name given to the room created alongside the account.
    pub fn default_room_name(&self) -> String {
        format!("{}'s room", self.display_name.trim())
    }
}

/// Partial profile update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub new_password: Option<String>,
    pub avatar_ref: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = self.display_name.as_deref() {
            require_text("display_name", name, DISPLAY_NAME_MAX_CHARS)?;
        }
        if let Some(password) = self.new_password.as_deref() {
            if password.is_empty() {
                return Err(ValidationError::Blank("new_password"));
            }
        }
        if let Some(avatar) = self.avatar_ref.as_deref() {
            limit_text("avatar_ref", avatar, AVATAR_REF_MAX_CHARS)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{NewAccount, ProfileUpdate};
    use crate::model::ValidationError;

    #[test]
    fn default_room_name_uses_trimmed_display_name() {
        let account = NewAccount::new("kim", "pw", "  Kim ");
        assert_eq!(account.default_room_name(), "Kim's room");
    }

    #[test]
    fn validate_rejects_blank_identifier_and_empty_password() {
        assert_eq!(
            NewAccount::new("  ", "pw", "Kim").validate(),
            Err(ValidationError::Blank("identifier"))
        );
        assert_eq!(
            NewAccount::new("kim", "", "Kim").validate(),
            Err(ValidationError::Blank("password"))
        );
    }

    #[test]
    fn profile_update_allows_empty_patch() {
        assert!(ProfileUpdate::default().validate().is_ok());
    }
}
