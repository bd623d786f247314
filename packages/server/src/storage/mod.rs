//! Storage abstraction layer for the photoline server.
//!
//! The [`Storage`] trait defines the contract between the HTTP handler layer
//! and persistence. Single-entry visibility checks live in the handlers; the
//! one exception is [`Storage::timeline`], which applies the visibility rule
//! inside the query so a page of 30 is 30 visible entries.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStorage`] | Tests, conformance suite, ephemeral servers |
//! | [`SqliteStorage`] | Production; durable single-file database |
//!
//! [`MemoryStorage`]: memory::MemoryStorage
//! [`SqliteStorage`]: sqlite::SqliteStorage

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use photoline::{Entry, EntryId, NewEntry, User, UserId};

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that storage operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested item does not exist.
    #[error("not found")]
    NotFound,

    /// An item with the same unique key already exists (e.g. a user name).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An unexpected error in the underlying storage backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// The persistence contract for a photoline server.
///
/// All methods are `async` and return `Result<_, StorageError>`. Implementations
/// must be `Send + Sync + 'static` so they can be held in an `Arc<dyn Storage>`.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    // --- Users ---------------------------------------------------------------

    /// Create a user and assign its id. Returns [`StorageError::Conflict`] if
    /// `name` or `api_key` is already taken.
    async fn create_user(
        &self,
        name: &str,
        api_key: &str,
        icon: &str,
    ) -> Result<User, StorageError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Resolve an API key to its user. Returns `None` for unknown keys.
    async fn get_user_by_api_key(&self, api_key: &str) -> Result<Option<User>, StorageError>;

    /// Point a user at a new icon id. Returns [`StorageError::NotFound`] if
    /// the user does not exist.
    async fn update_user_icon(&self, id: UserId, icon: &str) -> Result<(), StorageError>;

    // --- Entries -------------------------------------------------------------

    /// Insert an entry. Ids are assigned in strictly increasing order.
    async fn put_entry(&self, entry: &NewEntry) -> Result<Entry, StorageError>;

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, StorageError>;

    /// Find the entry that owns the stored image `image`.
    async fn get_entry_by_image(&self, image: &str) -> Result<Option<Entry>, StorageError>;

    /// Delete an entry. Returns [`StorageError::NotFound`] if it is absent.
    async fn delete_entry(&self, id: EntryId) -> Result<(), StorageError>;

    /// Entries visible to `viewer`, newest first, at most `limit` of them.
    ///
    /// With `after == 0` these are the newest visible entries. With
    /// `after > 0` they are the *oldest* visible entries with `id > after`,
    /// still returned newest first, so a client that falls behind catches up
    /// in order without skipping.
    async fn timeline(
        &self,
        viewer: UserId,
        after: EntryId,
        limit: u32,
    ) -> Result<Vec<Entry>, StorageError>;

    // --- Follows -------------------------------------------------------------

    /// Record that `user` follows `target`. Idempotent; a repeated follow
    /// keeps the original follow time.
    async fn add_follow(&self, user: UserId, target: UserId) -> Result<(), StorageError>;

    /// Remove a follow relationship. Idempotent (no error if it didn't exist).
    async fn remove_follow(&self, user: UserId, target: UserId) -> Result<(), StorageError>;

    /// Users that `user` follows, most recently followed first.
    async fn list_following(&self, user: UserId) -> Result<Vec<User>, StorageError>;

    /// Return `true` if `user` follows `target`.
    async fn is_following(&self, user: UserId, target: UserId) -> Result<bool, StorageError>;
}
