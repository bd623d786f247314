//! Assembles the Axum [`Router`] from all handler modules.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    handlers::{entries, follows, images, timeline, users, AppState, MAX_UPLOAD_BYTES},
    storage::Storage,
};

/// Build the complete application router with shared state.
pub fn build_router(storage: Arc<dyn Storage>, config: ServerConfig) -> Router {
    router_with_state(AppState::new(storage, config))
}

/// Build the router around an existing [`AppState`].
pub fn router_with_state(state: AppState) -> Router {
    Router::new()
        // Accounts
        .route("/signup", post(users::signup))
        .route("/me", get(users::me))
        // Timeline
        .route("/timeline", get(timeline::get_timeline))
        // Entries
        .route("/entry", post(entries::create))
        .route(
            "/entry/{id}",
            post(entries::delete_via_post).delete(entries::delete),
        )
        // Images and icons
        .route("/image/{id}", get(images::get_image))
        .route("/icon", post(images::upload_icon))
        .route("/icon/{id}", get(images::get_icon))
        // Follows
        .route("/following", get(follows::list_following))
        .route("/follow", post(follows::follow))
        .route("/unfollow", post(follows::unfollow))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
