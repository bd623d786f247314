//! Stored records for the photoline service.
//!
//! Entries and follow edges are the only mutable shared state in the system;
//! both are owned by the storage layer and handed out by value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned user identifier.
pub type UserId = i64;

/// Store-assigned entry identifier. Strictly increasing in insertion order,
/// which is what makes it usable as a timeline cursor.
pub type EntryId = i64;

/// Who may see an entry.
///
/// Serialises as its integer wire value (`0`, `1`, `2`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "u8", try_from = "u8")]
pub enum PublishLevel {
    /// Visible only to the owner.
    Private,
    /// Visible to the owner and to users who follow the owner.
    Followers,
    /// Visible to everyone, including anonymous viewers.
    Public,
}

impl PublishLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            PublishLevel::Private => 0,
            PublishLevel::Followers => 1,
            PublishLevel::Public => 2,
        }
    }
}

impl From<PublishLevel> for u8 {
    fn from(level: PublishLevel) -> Self {
        level.as_u8()
    }
}

impl TryFrom<u8> for PublishLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PublishLevel::Private),
            1 => Ok(PublishLevel::Followers),
            2 => Ok(PublishLevel::Public),
            other => Err(format!("unknown publish level {other}; expected 0, 1 or 2")),
        }
    }
}

impl std::fmt::Display for PublishLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A registered user.
///
/// `icon` is the hash id of the user's icon file, or `"default"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub api_key: String,
    pub icon: String,
}

/// A published photo.
///
/// Immutable once created; the only lifecycle transition is deletion by
/// its owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    /// Owning user.
    pub user: UserId,
    /// Hash id of the stored source image (`<data_dir>/image/<image>.jpg`).
    pub image: String,
    pub publish_level: PublishLevel,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when inserting an entry; the store assigns
/// `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub user: UserId,
    pub image: String,
    pub publish_level: PublishLevel,
}

/// A directed follow relationship: `user` follows `target`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FollowEdge {
    pub user: UserId,
    pub target: UserId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_level_serialises_as_integer() {
        let json = serde_json::to_string(&PublishLevel::Followers).unwrap();
        assert_eq!(json, "1");
        let back: PublishLevel = serde_json::from_str("2").unwrap();
        assert_eq!(back, PublishLevel::Public);
    }

    #[test]
    fn publish_level_rejects_unknown_value() {
        assert!(serde_json::from_str::<PublishLevel>("3").is_err());
        assert!(PublishLevel::try_from(7).is_err());
    }
}
