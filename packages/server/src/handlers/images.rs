//! On-Demand Image Server.
//!
//! - `GET  /image/{id}?size=s|m|l` — an entry's photo, subject to visibility.
//! - `GET  /icon/{id}?size=s|m|l`  — a user icon.
//! - `POST /icon`                  — replace the caller's icon.
//!
//! Every derivative is computed per request through the [`Transformer`];
//! the batch cache is not consulted. Each temp file is a scoped
//! [`tempfile::TempPath`] and is gone by the time the handler returns,
//! whether it succeeded, failed, or was cancelled by a client disconnect.
//!
//! [`Transformer`]: photoline_imaging::Transformer

use std::path::PathBuf;
use std::sync::LazyLock;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use photoline::{is_visible, needs_follow_check, random_hex_id, AssetKind, SizeClass};
use photoline_api::{IconResponse, SizeQuery};
use regex::Regex;

use crate::error::AppError;
use crate::middleware::auth::{BaseUrl, OptionalAuth, RequireAuth};

use super::{read_upload_form, AppState};

static IMAGE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]+$").expect("valid regex"));
static ICON_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-z]+$").expect("valid regex"));
static ICON_UPLOAD_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^image/(jpe?g|png)$").expect("valid regex"));

fn not_found(what: &str) -> AppError {
    AppError::NotFound(format!("{what} not found"))
}

fn image_response(kind: AssetKind, data: Bytes) -> Response {
    ([(header::CONTENT_TYPE, kind.content_type())], data).into_response()
}

/// Source path for `id`, or `None` when `id` is not a well-formed stored id.
fn source_path(state: &AppState, kind: AssetKind, id: &str) -> Option<PathBuf> {
    let valid = match kind {
        AssetKind::Image => IMAGE_ID.is_match(id),
        AssetKind::Icon => ICON_ID.is_match(id),
    };
    valid.then(|| {
        state
            .config
            .asset_dir(kind)
            .join(format!("{id}.{}", kind.extension()))
    })
}

/// `GET /image/{id}`
///
/// Invisible and missing entries are both 404. `s` and `m` are square
/// crops fitted within 128 and 256; `l` (the default, and the fallback for
/// unknown sizes) is the stored file unchanged.
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SizeQuery>,
    OptionalAuth(viewer): OptionalAuth,
) -> Result<Response, AppError> {
    let kind = AssetKind::Image;
    let path = source_path(&state, kind, &id).ok_or_else(|| not_found("image"))?;

    let entry = state
        .storage
        .get_entry_by_image(&id)
        .await?
        .ok_or_else(|| not_found("image"))?;

    let viewer_id = viewer.as_ref().map(|u| u.id);
    let follows_owner = match viewer_id {
        Some(v) if needs_follow_check(&entry, viewer_id) => {
            state.storage.is_following(v, entry.user).await?
        }
        _ => false,
    };
    if !is_visible(&entry, viewer_id, follows_owner) {
        return Err(not_found("image"));
    }

    if !tokio::fs::try_exists(&path).await? {
        return Err(not_found("image"));
    }

    let size = SizeClass::parse_or(query.size.as_deref(), kind.default_size());
    let data = match kind.on_demand_target(size) {
        None => Bytes::from(tokio::fs::read(&path).await?),
        Some(target) => {
            let square = state
                .transformer
                .crop_to_square(&path, kind.extension())
                .await?;
            state
                .transformer
                .resize_file(&square, kind.extension(), Some(target))
                .await?
        }
    };

    tracing::debug!(image = %id, size = %size, bytes = data.len(), "image served");
    Ok(image_response(kind, data))
}

/// `GET /icon/{id}`
///
/// Icons are fitted within 32, 64 or 128 without cropping; unknown sizes
/// fall back to `s`.
pub async fn get_icon(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SizeQuery>,
) -> Result<Response, AppError> {
    let kind = AssetKind::Icon;
    let path = source_path(&state, kind, &id).ok_or_else(|| not_found("icon"))?;
    if !tokio::fs::try_exists(&path).await? {
        return Err(not_found("icon"));
    }

    let size = SizeClass::parse_or(query.size.as_deref(), kind.default_size());
    let data = state
        .transformer
        .resize_file(&path, kind.extension(), kind.on_demand_target(size))
        .await?;

    tracing::debug!(icon = %id, size = %size, bytes = data.len(), "icon served");
    Ok(image_response(kind, data))
}

/// `POST /icon` — multipart with an `image` part (JPEG or PNG).
///
/// The upload is cropped to a centred square, stored as PNG under a fresh
/// id, and becomes the caller's icon.
pub async fn upload_icon(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    base: BaseUrl,
    multipart: Multipart,
) -> Result<Json<IconResponse>, AppError> {
    let form = read_upload_form(multipart).await?;
    let image = form
        .image
        .ok_or_else(|| AppError::BadRequest("missing image part".into()))?;
    let Some(caps) = ICON_UPLOAD_TYPE.captures(&image.content_type) else {
        return Err(AppError::BadRequest(format!(
            "icon must be a JPEG or PNG, got {:?}",
            image.content_type
        )));
    };
    let upload_ext = if &caps[1] == "png" { "png" } else { "jpg" };

    let upload = state.transformer.temp_path(upload_ext)?;
    tokio::fs::write(&upload, &image.data).await?;
    let square = state
        .transformer
        .crop_to_square(&upload, AssetKind::Icon.extension())
        .await?;

    let dir = state.config.asset_dir(AssetKind::Icon);
    tokio::fs::create_dir_all(&dir).await?;
    let icon_id = random_hex_id();
    let dest = dir.join(format!("{icon_id}.{}", AssetKind::Icon.extension()));
    tokio::fs::copy(&square, &dest).await?;

    state.storage.update_user_icon(user.id, &icon_id).await?;
    tracing::info!(user_id = user.id, icon = %icon_id, "icon updated");

    Ok(Json(IconResponse {
        icon: base.icon_url(&icon_id),
    }))
}
