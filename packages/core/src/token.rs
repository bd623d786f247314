//! Random identifiers for API keys and stored file names.
//!
//! Ids are the SHA-256 hex digest of a random UUID. They are opaque: two
//! uploads of identical bytes receive different ids.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a fresh 64-character lowercase hex id.
pub fn random_hex_id() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hex::encode(hasher.finalize())
}
