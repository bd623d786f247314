//! Entry visibility.
//!
//! An entry is visible to a viewer when any of these holds:
//!
//! - the viewer owns it;
//! - it is [`PublishLevel::Public`];
//! - it is [`PublishLevel::Followers`] and the viewer follows the owner.
//!
//! Anonymous viewers (`None`) only ever see public entries. The SQLite store
//! evaluates the same rule in SQL for timeline queries; this function is the
//! single-entry form used by the image route and the in-memory store.

use crate::types::{Entry, PublishLevel, UserId};

/// Decide whether `viewer` may see `entry`.
///
/// `follows_owner` is only consulted for followers-only entries; callers can
/// use [`needs_follow_check`] to skip the follow lookup when it cannot matter.
pub fn is_visible(entry: &Entry, viewer: Option<UserId>, follows_owner: bool) -> bool {
    match entry.publish_level {
        PublishLevel::Public => true,
        PublishLevel::Private => viewer == Some(entry.user),
        PublishLevel::Followers => match viewer {
            Some(v) if v == entry.user => true,
            Some(_) => follows_owner,
            None => false,
        },
    }
}

/// True when the answer of [`is_visible`] depends on whether `viewer`
/// follows the entry's owner.
pub fn needs_follow_check(entry: &Entry, viewer: Option<UserId>) -> bool {
    entry.publish_level == PublishLevel::Followers
        && matches!(viewer, Some(v) if v != entry.user)
}
