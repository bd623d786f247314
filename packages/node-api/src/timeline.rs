//! Long-poll timeline types — `GET /timeline`.

use serde::{Deserialize, Serialize};

use crate::entry::EntryView;

/// Query parameters for `GET /timeline`.
///
/// `latest_entry` is kept as a raw string so an unparseable value can be
/// treated as "no history" instead of rejecting the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineQuery {
    pub latest_entry: Option<String>,
}

impl TimelineQuery {
    /// The client's cursor; `0` when absent, unparseable, or negative.
    pub fn cursor(&self) -> i64 {
        self.latest_entry
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(0)
    }
}

/// Response body for `GET /timeline`.
///
/// `latest_entry` is always present so the client can re-request without
/// moving backward; it is unchanged when `entries` is empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineResponse {
    pub latest_entry: i64,
    /// Newly visible entries, newest first.
    pub entries: Vec<EntryView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_defaults_to_zero() {
        let q = |s: Option<&str>| TimelineQuery { latest_entry: s.map(String::from) }.cursor();
        assert_eq!(q(None), 0);
        assert_eq!(q(Some("abc")), 0);
        assert_eq!(q(Some("-4")), 0);
        assert_eq!(q(Some("42")), 42);
    }

    #[test]
    fn empty_timeline_serialises_entries_array() {
        let resp = TimelineResponse { latest_entry: 7, entries: vec![] };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["latest_entry"], 7);
        assert!(json["entries"].as_array().unwrap().is_empty());
    }
}
