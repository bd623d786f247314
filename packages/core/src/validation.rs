//! Validation of user names and publish levels.
//!
//! Failures carry the rejected input in a [`ValidationError`].

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::types::PublishLevel;

/// Errors returned when user input fails validation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("name must be 2-16 characters of [a-zA-Z0-9_], got: {0:?}")]
    InvalidName(String),

    #[error("publish_level must be 0, 1 or 2, got: {0:?}")]
    InvalidPublishLevel(String),
}

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]{2,16}$").expect("valid regex"));

/// Check a signup name.
pub fn validate_user_name(name: &str) -> Result<(), ValidationError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName(name.to_string()))
    }
}

/// Parse a `publish_level` form value.
pub fn parse_publish_level(raw: &str) -> Result<PublishLevel, ValidationError> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .and_then(|n| PublishLevel::try_from(n).ok())
        .ok_or_else(|| ValidationError::InvalidPublishLevel(raw.to_string()))
}
