//! API-key authentication and request-origin extractors.
//!
//! Provides three extractors:
//! - [`RequireAuth`]: requires a known API key; returns 400 if absent or unknown.
//! - [`OptionalAuth`]: resolves the caller if a known key is present.
//! - [`BaseUrl`]: the `http://host` prefix used to build absolute URLs.
//!
//! The key is read from the `X-API-Key` header, falling back to the
//! `api_key` cookie.

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use photoline::User;

use crate::{error::AppError, handlers::AppState};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY_COOKIE: &str = "api_key";

// ---------------------------------------------------------------------------
// Key lookup
// ---------------------------------------------------------------------------

/// The caller's API key: header first, then cookie. Empty values are absent.
pub fn api_key_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(key) = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(key.to_string());
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == API_KEY_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let Some(key) = api_key_from_headers(&parts.headers) else {
        return Ok(None);
    };
    Ok(state.storage.get_user_by_api_key(&key).await?)
}

// ---------------------------------------------------------------------------
// RequireAuth extractor
// ---------------------------------------------------------------------------

/// Axum extractor that requires a known API key.
///
/// A missing or unknown key is a 400, not a 401.
pub struct RequireAuth(pub User);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = AppState::from_ref(state);
        async move {
            resolve(parts, &app_state)
                .await?
                .map(RequireAuth)
                .ok_or_else(|| AppError::BadRequest("missing or unknown api key".into()))
        }
    }
}

// ---------------------------------------------------------------------------
// OptionalAuth extractor
// ---------------------------------------------------------------------------

/// Axum extractor that yields `Some(user)` for a known key, `None` otherwise.
///
/// Storage failures still reject the request with a 500.
pub struct OptionalAuth(pub Option<User>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = AppState::from_ref(state);
        async move { Ok(OptionalAuth(resolve(parts, &app_state).await?)) }
    }
}

// ---------------------------------------------------------------------------
// BaseUrl extractor
// ---------------------------------------------------------------------------

/// `http://<host>` where host comes from `X-Forwarded-Host`, else `Host`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(pub String);

impl BaseUrl {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let host = headers
            .get("x-forwarded-host")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
            .unwrap_or_default();
        BaseUrl(format!("http://{host}"))
    }

    pub fn image_url(&self, image: &str) -> String {
        format!("{}/image/{image}", self.0)
    }

    pub fn icon_url(&self, icon: &str) -> String {
        format!("{}/icon/{icon}", self.0)
    }
}

impl<S> FromRequestParts<S> for BaseUrl
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(BaseUrl::from_headers(&parts.headers))
    }
}
