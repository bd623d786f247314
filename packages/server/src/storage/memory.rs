//! In-memory storage implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests, the conformance suite, and ephemeral servers.
//!
//! Entries are stored in a [`BTreeMap`] keyed by id. Ids are assigned from a
//! counter, so `id > cursor` is a range query on the map.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use photoline::{is_visible, Entry, EntryId, FollowEdge, NewEntry, User, UserId};

use super::{Storage, StorageError};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Inner {
    users: BTreeMap<UserId, User>,
    api_keys: HashMap<String, UserId>,
    entries: BTreeMap<EntryId, Entry>,
    /// Insertion order; the last edge is the most recent follow.
    follows: Vec<FollowEdge>,
    next_user_id: UserId,
    next_entry_id: EntryId,
}

impl Inner {
    fn new() -> Self {
        Self {
            users: BTreeMap::new(),
            api_keys: HashMap::new(),
            entries: BTreeMap::new(),
            follows: Vec::new(),
            next_user_id: 1,
            next_entry_id: 1,
        }
    }

    fn follows(&self, user: UserId, target: UserId) -> bool {
        self.follows
            .iter()
            .any(|f| f.user == user && f.target == target)
    }

    fn visible_to(&self, entry: &Entry, viewer: UserId) -> bool {
        is_visible(entry, Some(viewer), self.follows(viewer, entry.user))
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Storage`].
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for MemoryStorage {
    // --- Users ---------------------------------------------------------------

    async fn create_user(
        &self,
        name: &str,
        api_key: &str,
        icon: &str,
    ) -> Result<User, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if inner.users.values().any(|u| u.name == name) {
            return Err(StorageError::Conflict(format!("user name {name} is taken")));
        }
        if inner.api_keys.contains_key(api_key) {
            return Err(StorageError::Conflict("api key already issued".into()));
        }
        let id = inner.next_user_id;
        inner.next_user_id += 1;
        let user = User {
            id,
            name: name.to_string(),
            api_key: api_key.to_string(),
            icon: icon.to_string(),
        };
        inner.api_keys.insert(user.api_key.clone(), id);
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.users.get(&id).cloned())
    }

    async fn get_user_by_api_key(&self, api_key: &str) -> Result<Option<User>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .api_keys
            .get(api_key)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn update_user_icon(&self, id: UserId, icon: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap();
        let user = inner.users.get_mut(&id).ok_or(StorageError::NotFound)?;
        user.icon = icon.to_string();
        Ok(())
    }

    // --- Entries -------------------------------------------------------------

    async fn put_entry(&self, entry: &NewEntry) -> Result<Entry, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if inner.entries.values().any(|e| e.image == entry.image) {
            return Err(StorageError::Conflict(format!(
                "image {} already has an entry",
                entry.image
            )));
        }
        let id = inner.next_entry_id;
        inner.next_entry_id += 1;
        let stored = Entry {
            id,
            user: entry.user,
            image: entry.image.clone(),
            publish_level: entry.publish_level,
            created_at: Utc::now(),
        };
        inner.entries.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.entries.get(&id).cloned())
    }

    async fn get_entry_by_image(&self, image: &str) -> Result<Option<Entry>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.entries.values().find(|e| e.image == image).cloned())
    }

    async fn delete_entry(&self, id: EntryId) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap();
        inner
            .entries
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn timeline(
        &self,
        viewer: UserId,
        after: EntryId,
        limit: u32,
    ) -> Result<Vec<Entry>, StorageError> {
        let inner = self.inner.read().unwrap();
        let limit = limit as usize;

        if after > 0 {
            let mut page: Vec<Entry> = inner
                .entries
                .range((Bound::Excluded(after), Bound::Unbounded))
                .map(|(_, e)| e)
                .filter(|e| inner.visible_to(e, viewer))
                .take(limit)
                .cloned()
                .collect();
            page.reverse();
            Ok(page)
        } else {
            Ok(inner
                .entries
                .values()
                .rev()
                .filter(|e| inner.visible_to(e, viewer))
                .take(limit)
                .cloned()
                .collect())
        }
    }

    // --- Follows -------------------------------------------------------------

    async fn add_follow(&self, user: UserId, target: UserId) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.follows(user, target) {
            inner.follows.push(FollowEdge {
                user,
                target,
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn remove_follow(&self, user: UserId, target: UserId) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap();
        inner
            .follows
            .retain(|f| !(f.user == user && f.target == target));
        Ok(())
    }

    async fn list_following(&self, user: UserId) -> Result<Vec<User>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .follows
            .iter()
            .rev()
            .filter(|f| f.user == user)
            .filter_map(|f| inner.users.get(&f.target).cloned())
            .collect())
    }

    async fn is_following(&self, user: UserId, target: UserId) -> Result<bool, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.follows(user, target))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
