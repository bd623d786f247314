//! Timeline Poll Coordinator.
//!
//! A timeline request races a deadline against a poll loop that re-queries
//! the store every `interval` until it finds entries newer than the client's
//! cursor. Both run inside one `tokio::select!`: whichever finishes first
//! wins and the other future is dropped on the spot, so an abandoned poll
//! loop never outlives its request and never issues another query.
//!
//! The deadline is wall-clock from the start of the request. A query that is
//! in flight when it fires is abandoned with the rest of the loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use photoline::{Entry, EntryId, User, UserId};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::storage::{Storage, StorageError};

/// Maximum entries returned by one poll.
pub const TIMELINE_LIMIT: u32 = 30;

/// Which side of the race ended a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The store returned entries above the cursor.
    Data,
    /// The deadline passed first.
    Timeout,
}

impl PollOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            PollOutcome::Data => "data",
            PollOutcome::Timeout => "timeout",
        }
    }
}

/// Result of one long-poll.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePage {
    /// The cursor the client should send next. Never less than the cursor
    /// it sent.
    pub cursor: EntryId,
    /// Entries paired with their owners, newest first.
    pub entries: Vec<(Entry, User)>,
    /// May be `Data` with no entries when every new entry's owner is gone;
    /// the cursor still moves past them.
    pub outcome: PollOutcome,
}

impl TimelinePage {
    fn timed_out(cursor: EntryId) -> Self {
        Self {
            cursor,
            entries: Vec::new(),
            outcome: PollOutcome::Timeout,
        }
    }
}

/// Long-poll coordinator over a [`Storage`].
#[derive(Clone)]
pub struct TimelinePoller {
    storage: Arc<dyn Storage>,
    timeout: Duration,
    interval: Duration,
    limit: u32,
}

impl TimelinePoller {
    pub fn new(storage: Arc<dyn Storage>, timeout: Duration, interval: Duration) -> Self {
        Self {
            storage,
            timeout,
            interval,
            limit: TIMELINE_LIMIT,
        }
    }

    /// Wait until entries visible to `viewer` with `id > cursor` exist, or
    /// until the deadline passes.
    ///
    /// With `cursor == 0` any visible entry counts. On timeout the page is
    /// empty and carries the unchanged cursor.
    pub async fn poll(&self, viewer: UserId, cursor: EntryId) -> Result<TimelinePage, StorageError> {
        let started_at = Instant::now();
        let deadline = sleep(self.timeout);
        tokio::pin!(deadline);

        let page = tokio::select! {
            result = self.poll_until_found(viewer, cursor) => result?,
            _ = &mut deadline => TimelinePage::timed_out(cursor),
        };

        info!(
            viewer,
            cursor,
            latest_entry = page.cursor,
            returned = page.entries.len(),
            outcome = page.outcome.as_str(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "timeline poll finished"
        );
        Ok(page)
    }

    async fn poll_until_found(
        &self,
        viewer: UserId,
        cursor: EntryId,
    ) -> Result<TimelinePage, StorageError> {
        loop {
            let entries = self.storage.timeline(viewer, cursor, self.limit).await?;
            if !entries.is_empty() {
                return self.enrich(cursor, entries).await;
            }
            debug!(viewer, cursor, "timeline empty; waiting");
            sleep(self.interval).await;
        }
    }

    /// Attach owners, one lookup per distinct owner. Entries whose owner has
    /// vanished are dropped.
    async fn enrich(
        &self,
        cursor: EntryId,
        entries: Vec<Entry>,
    ) -> Result<TimelinePage, StorageError> {
        let newest = entries.iter().map(|e| e.id).max().unwrap_or(cursor);

        let mut owners: HashMap<UserId, Option<User>> = HashMap::new();
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            if !owners.contains_key(&entry.user) {
                let owner = self.storage.get_user(entry.user).await?;
                owners.insert(entry.user, owner);
            }
            if let Some(Some(owner)) = owners.get(&entry.user) {
                out.push((entry, owner.clone()));
            }
        }

        Ok(TimelinePage {
            cursor: newest.max(cursor),
            entries: out,
            outcome: PollOutcome::Data,
        })
    }
}
