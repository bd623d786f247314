//! Domain types and pure logic for the photoline photo-sharing service.
//!
//! This crate has no I/O. It defines the records the server stores, the
//! visibility rule that decides who may see an entry, and the size classes
//! used by both the on-demand image routes and the batch thumbnail pipeline.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Stored records: [`Entry`], [`User`], [`FollowEdge`], [`PublishLevel`] |
//! | [`visibility`] | The entry visibility predicate via [`is_visible`] |
//! | [`sizes`] | [`SizeClass`], [`AssetKind`] and the geometry targets they map to |
//! | [`validation`] | Input checks for signup names and publish levels |
//! | [`token`] | Random hex identifiers for API keys and stored files |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use photoline::{is_visible, Entry, PublishLevel};
//!
//! let visible = is_visible(&entry, Some(viewer_id), follows_owner);
//! ```

pub mod sizes;
pub mod token;
pub mod types;
pub mod validation;
pub mod visibility;

pub use sizes::{AssetKind, Fit, ResizeTarget, SizeClass};
pub use token::random_hex_id;
pub use types::{Entry, EntryId, FollowEdge, NewEntry, PublishLevel, User, UserId};
pub use validation::{parse_publish_level, validate_user_name, ValidationError};
pub use visibility::{is_visible, needs_follow_check};
