//! Database row types — these map directly to SQLite rows.
//! Timestamps are stored as RFC 3339 text and parsed lazily by consumers;
//! an unparseable expiry reads as already expired.

use chrono::{DateTime, Utc};

pub struct PendingRow {
    pub sender_id: i64,
    pub group_id: i64,
    pub receiver_id: i64,
    pub created_at: String,
    pub expires_at: String,
    pub guide_message_id: Option<i64>,
}

impl PendingRow {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        expired(&self.expires_at, now)
    }
}

pub struct WhisperRow {
    pub id: i64,
    pub group_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub body: String,
    pub status: String,
    pub delivery_message_id: Option<i64>,
    pub created_at: String,
}

pub struct InlineWhisperRow {
    pub token: String,
    pub sender_id: i64,
    /// Stored lowercase; compared case-insensitively against viewer usernames.
    pub receiver_username: String,
    pub body: String,
    pub created_at: String,
    pub expires_at: String,
    pub reported: bool,
}

impl InlineWhisperRow {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        expired(&self.expires_at, now)
    }
}

pub struct ChatRow {
    pub chat_id: i64,
    pub title: Option<String>,
    pub kind: String,
    pub last_seen: String,
}

fn expired(expires_at: &str, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(expires_at) {
        Ok(t) => now > t.with_timezone(&Utc),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn expiry_compares_against_now() {
        let now = Utc::now();
        let future = (now + TimeDelta::seconds(60)).to_rfc3339();
        let past = (now - TimeDelta::seconds(60)).to_rfc3339();
        assert!(!expired(&future, now));
        assert!(expired(&past, now));
    }

    #[test]
    fn garbage_expiry_reads_as_expired() {
        assert!(expired("not a timestamp", Utc::now()));
    }
}
