//! Entry and image types — `POST /entry`, `/image/{id}`, `/icon/{id}`.

use photoline::PublishLevel;
use serde::{Deserialize, Serialize};

use crate::user::UserView;

/// An entry as returned by `POST /entry` and inside timeline responses.
///
/// `image` is an absolute URL (`<base>/image/<image-id>`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryView {
    pub id: i64,
    pub image: String,
    pub publish_level: PublishLevel,
    pub user: UserView,
}

/// Query parameters for `GET /image/{id}` and `GET /icon/{id}`.
///
/// Unknown values fall back to the route's default size.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SizeQuery {
    pub size: Option<String>,
}

/// Response body for `POST /icon`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IconResponse {
    pub icon: String,
}

/// Response body for entry deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OkResponse {
    pub ok: bool,
}
