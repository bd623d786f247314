//! Request and response types for the photoline HTTP API.
//!
//! Shared by the server, the conformance suite, and any Rust client.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | POST | `/signup` | form `name` → [`SignupResponse`] |
//! | GET | `/me` | → [`UserView`] |
//! | GET | `/timeline` | [`TimelineQuery`] → [`TimelineResponse`] |
//! | POST | `/entry` | multipart → [`EntryView`] |
//! | POST/DELETE | `/entry/{id}` | → [`OkResponse`] |
//! | POST | `/icon` | multipart → [`IconResponse`] |
//! | GET | `/following` | → [`FollowingResponse`] |
//! | POST | `/follow`, `/unfollow` | form `target`* → [`FollowingResponse`] |
//! | GET | `/image/{id}`, `/icon/{id}` | [`SizeQuery`] → image bytes |

pub mod entry;
pub mod error;
pub mod follow;
pub mod timeline;
pub mod user;

pub use entry::{EntryView, IconResponse, OkResponse, SizeQuery};
pub use error::ErrorResponse;
pub use follow::FollowingResponse;
pub use timeline::{TimelineQuery, TimelineResponse};
pub use user::{SignupResponse, UserView};
