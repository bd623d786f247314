//! User views — `POST /signup`, `GET /me`.

use serde::{Deserialize, Serialize};

/// Public profile of a user, embedded in entries and follow lists.
///
/// `icon` is an absolute URL (`<base>/icon/<icon-id>`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserView {
    pub id: i64,
    pub name: String,
    pub icon: String,
}

/// Response body for `POST /signup`. The only response that reveals the
/// caller's API key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignupResponse {
    pub id: i64,
    pub name: String,
    pub api_key: String,
    pub icon: String,
}
