//! Follow list — `GET /following`, `POST /follow`, `POST /unfollow`.

use serde::{Deserialize, Serialize};

use crate::user::UserView;

/// Users the caller follows, most recently followed first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FollowingResponse {
    pub users: Vec<UserView>,
}
