//! Entry handlers.
//!
//! - `POST   /entry`       — upload a JPEG and publish it.
//! - `POST   /entry/{id}`  — delete, when the form carries `__method=DELETE`.
//! - `DELETE /entry/{id}`  — delete.
//!
//! Only the owner may delete an entry. A missing entry is 404; any other
//! refusal is 400.

use std::sync::LazyLock;

use axum::{
    extract::{Multipart, Path, State},
    Form, Json,
};
use photoline::{parse_publish_level, random_hex_id, AssetKind, EntryId, NewEntry, User};
use photoline_api::{EntryView, OkResponse};
use regex::Regex;
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::auth::{BaseUrl, RequireAuth};

use super::{entry_view, read_upload_form, AppState};

static JPEG_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^image/jpe?g").expect("valid regex"));

/// `POST /entry` — multipart with an `image` part and a `publish_level` field.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    base: BaseUrl,
    multipart: Multipart,
) -> Result<Json<EntryView>, AppError> {
    let form = read_upload_form(multipart).await?;

    let image = form
        .image
        .ok_or_else(|| AppError::BadRequest("missing image part".into()))?;
    if !JPEG_TYPE.is_match(&image.content_type) {
        return Err(AppError::BadRequest(format!(
            "image must be a JPEG, got {:?}",
            image.content_type
        )));
    }
    let publish_level = parse_publish_level(
        form.fields
            .get("publish_level")
            .map(String::as_str)
            .unwrap_or_default(),
    )?;

    let dir = state.config.asset_dir(AssetKind::Image);
    tokio::fs::create_dir_all(&dir).await?;
    let image_id = random_hex_id();
    let path = dir.join(format!("{image_id}.{}", AssetKind::Image.extension()));
    tokio::fs::write(&path, &image.data).await?;

    let stored = state
        .storage
        .put_entry(&NewEntry {
            user: user.id,
            image: image_id,
            publish_level,
        })
        .await;
    let entry = match stored {
        Ok(entry) => entry,
        Err(e) => {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        entry_id = entry.id,
        user_id = user.id,
        publish_level = %entry.publish_level,
        bytes = image.data.len(),
        "entry created"
    );
    Ok(Json(entry_view(&base, &entry, &user)))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteForm {
    #[serde(rename = "__method", default)]
    pub method: Option<String>,
}

/// `POST /entry/{id}` with `__method=DELETE`.
pub async fn delete_via_post(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<DeleteForm>,
) -> Result<Json<OkResponse>, AppError> {
    let method_ok = form.method.as_deref() == Some("DELETE");
    delete_owned(&state, id, &user, method_ok).await
}

/// `DELETE /entry/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<OkResponse>, AppError> {
    delete_owned(&state, id, &user, true).await
}

async fn delete_owned(
    state: &AppState,
    id: EntryId,
    user: &User,
    method_ok: bool,
) -> Result<Json<OkResponse>, AppError> {
    let entry = state
        .storage
        .get_entry(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("entry {id} not found")))?;

    if entry.user != user.id || !method_ok {
        return Err(AppError::BadRequest("cannot delete this entry".into()));
    }

    state.storage.delete_entry(id).await?;
    tracing::info!(entry_id = id, user_id = user.id, "entry deleted");
    Ok(Json(OkResponse { ok: true }))
}
