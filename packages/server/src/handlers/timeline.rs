//! `GET /timeline?latest_entry=<id>` — long-poll for newly visible entries.

use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use photoline_api::{TimelineQuery, TimelineResponse};

use crate::error::AppError;
use crate::middleware::auth::{BaseUrl, RequireAuth};

use super::{entry_view, no_cache, AppState};

/// Holds the request open until entries newer than `latest_entry` are
/// visible to the caller, or the poll timeout passes.
///
/// The response always carries a `latest_entry` the client can send back;
/// on timeout it is the cursor the client sent.
pub async fn get_timeline(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    base: BaseUrl,
    Query(query): Query<TimelineQuery>,
) -> Result<Response, AppError> {
    let page = state.poller.poll(user.id, query.cursor()).await?;
    let entries = page
        .entries
        .iter()
        .map(|(entry, owner)| entry_view(&base, entry, owner))
        .collect();
    Ok(no_cache(Json(TimelineResponse {
        latest_entry: page.cursor,
        entries,
    })))
}
