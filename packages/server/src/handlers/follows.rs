//! Follow-graph handlers.
//!
//! - `GET  /following` — users the caller follows, newest follow first.
//! - `POST /follow`    — follow every `target` in the form body.
//! - `POST /unfollow`  — unfollow every `target` in the form body.
//!
//! `target` may repeat. Self-targets, non-numeric values, and unknown users
//! are skipped rather than rejected. All three respond with the updated
//! following list.

use axum::{body::Bytes, extract::State, response::Response, Json};
use photoline::{User, UserId};
use photoline_api::FollowingResponse;

use crate::error::AppError;
use crate::middleware::auth::{BaseUrl, RequireAuth};

use super::{no_cache, user_view, AppState};

/// Every parseable `target` value in an urlencoded body, excluding `me`.
pub(crate) fn parse_targets(body: &[u8], me: UserId) -> Vec<UserId> {
    url::form_urlencoded::parse(body)
        .filter(|(key, _)| key == "target")
        .filter_map(|(_, value)| value.trim().parse::<UserId>().ok())
        .filter(|&target| target != me)
        .collect()
}

async fn following_response(
    state: &AppState,
    user: &User,
    base: &BaseUrl,
) -> Result<Response, AppError> {
    let users = state
        .storage
        .list_following(user.id)
        .await?
        .iter()
        .map(|u| user_view(base, u))
        .collect();
    Ok(no_cache(Json(FollowingResponse { users })))
}

/// `GET /following`
pub async fn list_following(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    base: BaseUrl,
) -> Result<Response, AppError> {
    following_response(&state, &user, &base).await
}

/// `POST /follow`
pub async fn follow(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    base: BaseUrl,
    body: Bytes,
) -> Result<Response, AppError> {
    for target in parse_targets(&body, user.id) {
        if state.storage.get_user(target).await?.is_none() {
            tracing::debug!(user_id = user.id, target, "follow target does not exist");
            continue;
        }
        state.storage.add_follow(user.id, target).await?;
        tracing::info!(user_id = user.id, target, "followed");
    }
    following_response(&state, &user, &base).await
}

/// `POST /unfollow`
pub async fn unfollow(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    base: BaseUrl,
    body: Bytes,
) -> Result<Response, AppError> {
    for target in parse_targets(&body, user.id) {
        state.storage.remove_follow(user.id, target).await?;
        tracing::info!(user_id = user.id, target, "unfollowed");
    }
    following_response(&state, &user, &base).await
}
