//! Public surface for the `photoline-server` crate.
//!
//! Exposes the router builder, config, and storage types so that external
//! crates (e.g. the conformance test suite) can spin up an in-process server
//! without spawning a subprocess.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | [`ServerConfig`] from `PHOTOLINE_*` environment variables |
//! | [`storage`] | [`Storage`] trait with in-memory and SQLite backends |
//! | [`timeline`] | [`TimelinePoller`], the long-poll coordinator |
//! | [`handlers`] | One module per endpoint group, plus [`AppState`] |
//! | [`middleware`] | API-key and base-URL extractors |
//! | [`router`] | [`build_router`] |

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod timeline;

pub use config::{ConfigError, ServerConfig};
pub use handlers::AppState;
pub use router::{build_router, router_with_state};
pub use storage::{memory::MemoryStorage, sqlite::SqliteStorage, Storage, StorageError};
pub use timeline::{PollOutcome, TimelinePage, TimelinePoller, TIMELINE_LIMIT};
