//! HTTP request handlers for all photoline endpoints.
//!
//! Each submodule covers a logical group of endpoints. Handlers are async
//! functions that receive Axum extractors and return
//! `Result<impl IntoResponse, AppError>`.
//!
//! Single-entry visibility checks live here, not in storage.

pub mod entries;
pub mod follows;
pub mod images;
pub mod timeline;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::Multipart,
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use photoline::{Entry, User};
use photoline_api::{EntryView, UserView};
use photoline_imaging::Transformer;

use crate::{
    config::ServerConfig, error::AppError, middleware::auth::BaseUrl, storage::Storage,
    timeline::TimelinePoller,
};

/// Largest accepted request body, for photo and icon uploads.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared application state threaded through all Axum handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: Arc<ServerConfig>,
    /// Raster engine plus the scratch directory for per-request temp files.
    pub transformer: Arc<Transformer>,
    pub poller: TimelinePoller,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, config: ServerConfig) -> Self {
        let engine = config.raster.build(config.magick_timeout);
        let transformer = Arc::new(Transformer::new(engine, config.tmp_dir.clone()));
        let poller = TimelinePoller::new(
            Arc::clone(&storage),
            config.poll_timeout,
            config.poll_interval,
        );
        Self {
            storage,
            config: Arc::new(config),
            transformer,
            poller,
        }
    }
}

// ---------------------------------------------------------------------------
// View helpers
// ---------------------------------------------------------------------------

pub(crate) fn user_view(base: &BaseUrl, user: &User) -> UserView {
    UserView {
        id: user.id,
        name: user.name.clone(),
        icon: base.icon_url(&user.icon),
    }
}

pub(crate) fn entry_view(base: &BaseUrl, entry: &Entry, owner: &User) -> EntryView {
    EntryView {
        id: entry.id,
        image: base.image_url(&entry.image),
        publish_level: entry.publish_level,
        user: user_view(base, owner),
    }
}

/// Mark a response as non-cacheable.
pub(crate) fn no_cache(body: impl IntoResponse) -> Response {
    ([(header::CACHE_CONTROL, "no-cache")], body).into_response()
}

// ---------------------------------------------------------------------------
// Multipart uploads
// ---------------------------------------------------------------------------

/// The `image` part of an upload form.
pub(crate) struct UploadedFile {
    pub content_type: String,
    pub data: Bytes,
}

/// A parsed upload form: the `image` file part and any text fields.
pub(crate) struct UploadForm {
    pub image: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

pub(crate) async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm {
        image: None,
        fields: HashMap::new(),
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "image" {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("invalid image part: {e}")))?;
            form.image = Some(UploadedFile { content_type, data });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("invalid form field {name}: {e}")))?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}
