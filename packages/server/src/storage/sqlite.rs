//! SQLite-backed storage implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! # Schema
//!
//! - `users` — name and API key are unique.
//! - `entries` — one row per uploaded photo; `image` is the stored file id.
//! - `follow_map` — (user, target) edges with the time of the follow.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use photoline::{Entry, EntryId, NewEntry, PublishLevel, User, UserId};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::{Storage, StorageError};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    name     TEXT NOT NULL UNIQUE,
    api_key  TEXT NOT NULL UNIQUE,
    icon     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entries (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    user           INTEGER NOT NULL,
    image          TEXT NOT NULL UNIQUE,
    publish_level  INTEGER NOT NULL,
    created_at     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_entries_user ON entries(user);

CREATE TABLE IF NOT EXISTS follow_map (
    user        INTEGER NOT NULL,
    target      INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (user, target)
);
";

/// Visibility rule for `viewer = ?1`, kept in step with `photoline::is_visible`.
const VISIBLE_TO_VIEWER: &str = "(user = ?1
    OR publish_level = 2
    OR (publish_level = 1 AND user IN (SELECT target FROM follow_map WHERE user = ?1)))";

const ENTRY_COLUMNS: &str = "id, user, image, publish_level, created_at";

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`Storage`].
///
/// Holds a single database connection protected by a `Mutex`. All operations
/// run inside `spawn_blocking` to avoid blocking the async runtime.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            f(&conn)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Row mapping and error conversions
// ---------------------------------------------------------------------------

fn map_err(e: rusqlite::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

fn now_text() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        api_key: row.get(2)?,
        icon: row.get(3)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let level: u8 = row.get(3)?;
    let publish_level = PublishLevel::try_from(level).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Integer, e.into())
    })?;
    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);
    Ok(Entry {
        id: row.get(0)?,
        user: row.get(1)?,
        image: row.get(2)?,
        publish_level,
        created_at,
    })
}

fn query_entries(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Entry>, StorageError> {
    let mut stmt = conn.prepare(sql).map_err(map_err)?;
    let rows = stmt.query_map(params, entry_from_row).map_err(map_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(map_err)
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for SqliteStorage {
    // --- Users ---------------------------------------------------------------

    async fn create_user(
        &self,
        name: &str,
        api_key: &str,
        icon: &str,
    ) -> Result<User, StorageError> {
        let (name, api_key, icon) = (name.to_string(), api_key.to_string(), icon.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (name, api_key, icon) VALUES (?1, ?2, ?3)",
                params![name, api_key, icon],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StorageError::Conflict(format!("user name {name} is taken"))
                } else {
                    map_err(e)
                }
            })?;
            Ok(User {
                id: conn.last_insert_rowid(),
                name,
                api_key,
                icon,
            })
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, name, api_key, icon FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }

    async fn get_user_by_api_key(&self, api_key: &str) -> Result<Option<User>, StorageError> {
        let api_key = api_key.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, name, api_key, icon FROM users WHERE api_key = ?1",
                params![api_key],
                user_from_row,
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }

    async fn update_user_icon(&self, id: UserId, icon: &str) -> Result<(), StorageError> {
        let icon = icon.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute("UPDATE users SET icon = ?1 WHERE id = ?2", params![icon, id])
                .map_err(map_err)?;
            if changed == 0 {
                return Err(StorageError::NotFound);
            }
            Ok(())
        })
        .await
    }

    // --- Entries -------------------------------------------------------------

    async fn put_entry(&self, entry: &NewEntry) -> Result<Entry, StorageError> {
        let entry = entry.clone();
        self.with_conn(move |conn| {
            let created_at = now_text();
            conn.execute(
                "INSERT INTO entries (user, image, publish_level, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entry.user, entry.image, entry.publish_level.as_u8(), created_at],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StorageError::Conflict(format!("image {} already has an entry", entry.image))
                } else {
                    map_err(e)
                }
            })?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                params![id],
                entry_from_row,
            )
            .map_err(map_err)
        })
        .await
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, StorageError> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                params![id],
                entry_from_row,
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }

    async fn get_entry_by_image(&self, image: &str) -> Result<Option<Entry>, StorageError> {
        let image = image.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE image = ?1"),
                params![image],
                entry_from_row,
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }

    async fn delete_entry(&self, id: EntryId) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute("DELETE FROM entries WHERE id = ?1", params![id])
                .map_err(map_err)?;
            if changed == 0 {
                return Err(StorageError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn timeline(
        &self,
        viewer: UserId,
        after: EntryId,
        limit: u32,
    ) -> Result<Vec<Entry>, StorageError> {
        self.with_conn(move |conn| {
            if after > 0 {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM (
                         SELECT {ENTRY_COLUMNS} FROM entries
                         WHERE {VISIBLE_TO_VIEWER} AND id > ?2
                         ORDER BY id ASC LIMIT ?3
                     ) ORDER BY id DESC"
                );
                query_entries(conn, &sql, params![viewer, after, limit])
            } else {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries
                     WHERE {VISIBLE_TO_VIEWER}
                     ORDER BY id DESC LIMIT ?2"
                );
                query_entries(conn, &sql, params![viewer, limit])
            }
        })
        .await
    }

    // --- Follows -------------------------------------------------------------

    async fn add_follow(&self, user: UserId, target: UserId) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO follow_map (user, target, created_at) VALUES (?1, ?2, ?3)",
                params![user, target, now_text()],
            )
            .map_err(map_err)?;
            Ok(())
        })
        .await
    }

    async fn remove_follow(&self, user: UserId, target: UserId) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM follow_map WHERE user = ?1 AND target = ?2",
                params![user, target],
            )
            .map_err(map_err)?;
            Ok(())
        })
        .await
    }

    async fn list_following(&self, user: UserId) -> Result<Vec<User>, StorageError> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT u.id, u.name, u.api_key, u.icon
                     FROM follow_map f JOIN users u ON f.target = u.id
                     WHERE f.user = ?1
                     ORDER BY f.created_at DESC, f.rowid DESC",
                )
                .map_err(map_err)?;
            let rows = stmt.query_map(params![user], user_from_row).map_err(map_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(map_err)
        })
        .await
    }

    async fn is_following(&self, user: UserId, target: UserId) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM follow_map WHERE user = ?1 AND target = ?2",
                    params![user, target],
                    |row| row.get(0),
                )
                .map_err(map_err)?;
            Ok(count > 0)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
