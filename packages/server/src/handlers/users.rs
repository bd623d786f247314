//! Account handlers.
//!
//! - `POST /signup` — create a user and issue its API key.
//! - `GET  /me`     — the caller's profile.

use axum::{extract::State, Form, Json};
use photoline::{random_hex_id, validate_user_name};
use photoline_api::{SignupResponse, UserView};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::auth::{BaseUrl, RequireAuth};

use super::{user_view, AppState};

/// Icon id every new account starts with.
pub const DEFAULT_ICON: &str = "default";

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
}

/// `POST /signup` — returns 400 for a malformed name, 409 if it is taken.
pub async fn signup(
    State(state): State<AppState>,
    base: BaseUrl,
    Form(form): Form<SignupForm>,
) -> Result<Json<SignupResponse>, AppError> {
    validate_user_name(&form.name)?;

    let api_key = random_hex_id();
    let user = state
        .storage
        .create_user(&form.name, &api_key, DEFAULT_ICON)
        .await?;

    tracing::info!(user_id = user.id, name = %user.name, "user signed up");

    Ok(Json(SignupResponse {
        id: user.id,
        name: user.name,
        api_key: user.api_key,
        icon: base.icon_url(&user.icon),
    }))
}

/// `GET /me`
pub async fn me(RequireAuth(user): RequireAuth, base: BaseUrl) -> Json<UserView> {
    Json(user_view(&base, &user))
}
