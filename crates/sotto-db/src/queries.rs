use crate::Database;
use crate::models::{ChatRow, InlineWhisperRow, PendingRow, WhisperRow};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

impl Database {
    // -- Identity cache --

    pub fn upsert_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, username, first_name, last_seen)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id) DO UPDATE SET
                   username = excluded.username,
                   first_name = excluded.first_name,
                   last_seen = excluded.last_seen",
                rusqlite::params![user_id, username, first_name, now.to_rfc3339()],
            )?;
            Ok(())
        })
    }

    pub fn upsert_chat(
        &self,
        chat_id: i64,
        title: Option<&str>,
        kind: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chats (chat_id, title, kind, last_seen)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (chat_id) DO UPDATE SET
                   title = excluded.title,
                   kind = excluded.kind,
                   last_seen = excluded.last_seen",
                rusqlite::params![chat_id, title, kind, now.to_rfc3339()],
            )?;
            Ok(())
        })
    }

    /// Cached display name, if we have ever seen this user.
    pub fn display_name(&self, user_id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT first_name FROM users WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn chat_title(&self, chat_id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT title FROM chats WHERE chat_id = ?1",
                [chat_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map(Option::flatten)
        })
    }

    pub fn list_groups(&self) -> Result<Vec<ChatRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, title, kind, last_seen FROM chats
                 WHERE kind IN ('group', 'supergroup')
                 ORDER BY last_seen DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ChatRow {
                        chat_id: row.get(0)?,
                        title: row.get(1)?,
                        kind: row.get(2)?,
                        last_seen: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn all_user_ids(&self) -> Result<Vec<i64>> {
        self.with_conn(|conn| collect_ids(conn, "SELECT user_id FROM users"))
    }

    pub fn all_group_ids(&self) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            collect_ids(
                conn,
                "SELECT chat_id FROM chats WHERE kind IN ('group', 'supergroup')",
            )
        })
    }

    // -- Pending requests --

    /// Register a whisper intent. Last trigger wins: a second trigger from
    /// the same sender overwrites the previous row in one statement, and any
    /// stale guide-message handle is cleared with it.
    pub fn upsert_pending(
        &self,
        sender_id: i64,
        group_id: i64,
        receiver_id: i64,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pending
                   (sender_id, group_id, receiver_id, created_at, expires_at, guide_message_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL)
                 ON CONFLICT (sender_id) DO UPDATE SET
                   group_id = excluded.group_id,
                   receiver_id = excluded.receiver_id,
                   created_at = excluded.created_at,
                   expires_at = excluded.expires_at,
                   guide_message_id = NULL",
                rusqlite::params![
                    sender_id,
                    group_id,
                    receiver_id,
                    now.to_rfc3339(),
                    expires_at.to_rfc3339()
                ],
            )?;
            Ok(())
        })
    }

    pub fn set_pending_guide(&self, sender_id: i64, guide_message_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE pending SET guide_message_id = ?1 WHERE sender_id = ?2",
                rusqlite::params![guide_message_id, sender_id],
            )?;
            Ok(())
        })
    }

    /// Read and delete the sender's pending request in one statement.
    /// Of any number of concurrent submissions, exactly one gets the row.
    pub fn consume_pending(&self, sender_id: i64) -> Result<Option<PendingRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "DELETE FROM pending WHERE sender_id = ?1
                 RETURNING sender_id, group_id, receiver_id, created_at, expires_at, guide_message_id",
                [sender_id],
                |row| {
                    Ok(PendingRow {
                        sender_id: row.get(0)?,
                        group_id: row.get(1)?,
                        receiver_id: row.get(2)?,
                        created_at: row.get(3)?,
                        expires_at: row.get(4)?,
                        guide_message_id: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Whispers (reply path + resolved inline whispers) --

    /// Insert a delivered whisper with status `sent`. Returns the new row id.
    pub fn insert_whisper(
        &self,
        group_id: i64,
        sender_id: i64,
        receiver_id: i64,
        body: &str,
        delivery_message_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO whispers
                   (group_id, sender_id, receiver_id, body, status, delivery_message_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'sent', ?5, ?6)",
                rusqlite::params![
                    group_id,
                    sender_id,
                    receiver_id,
                    body,
                    delivery_message_id,
                    now.to_rfc3339()
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Insert unless an identical whisper already exists (content dedup on
    /// group + sender + receiver + body). Returns the id only when inserted.
    /// Concurrent resolution attempts for the same token land here; the
    /// unique index makes the race harmless.
    pub fn insert_whisper_dedup(
        &self,
        group_id: i64,
        sender_id: i64,
        receiver_id: i64,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO whispers
                   (group_id, sender_id, receiver_id, body, status, delivery_message_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'sent', NULL, ?5)",
                rusqlite::params![group_id, sender_id, receiver_id, body, now.to_rfc3339()],
            )?;
            if inserted == 1 {
                Ok(Some(conn.last_insert_rowid()))
            } else {
                Ok(None)
            }
        })
    }

    /// Latest whisper for a (group, sender, receiver) registry key.
    pub fn get_whisper(
        &self,
        group_id: i64,
        sender_id: i64,
        receiver_id: i64,
    ) -> Result<Option<WhisperRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, group_id, sender_id, receiver_id, body, status, delivery_message_id, created_at
                 FROM whispers
                 WHERE group_id = ?1 AND sender_id = ?2 AND receiver_id = ?3
                 ORDER BY id DESC LIMIT 1",
                rusqlite::params![group_id, sender_id, receiver_id],
                map_whisper_row,
            )
            .optional()
        })
    }

    /// Flip sent -> read on first authorized reveal. Idempotent.
    pub fn mark_whisper_read(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE whispers SET status = 'read' WHERE id = ?1 AND status = 'sent'",
                [id],
            )?;
            Ok(())
        })
    }

    // -- Inline whispers --

    pub fn insert_inline_whisper(
        &self,
        token: &str,
        sender_id: i64,
        receiver_username: &str,
        body: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO inline_whispers
                   (token, sender_id, receiver_username, body, created_at, expires_at, reported)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                rusqlite::params![
                    token,
                    sender_id,
                    receiver_username.to_lowercase(),
                    body,
                    now.to_rfc3339(),
                    expires_at.to_rfc3339()
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_inline_whisper(&self, token: &str) -> Result<Option<InlineWhisperRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT token, sender_id, receiver_username, body, created_at, expires_at, reported
                 FROM inline_whispers WHERE token = ?1",
                [token],
                |row| {
                    Ok(InlineWhisperRow {
                        token: row.get(0)?,
                        sender_id: row.get(1)?,
                        receiver_username: row.get(2)?,
                        body: row.get(3)?,
                        created_at: row.get(4)?,
                        expires_at: row.get(5)?,
                        reported: row.get::<_, i64>(6)? != 0,
                    })
                },
            )
            .optional()
        })
    }

    /// Compare-and-set on the `reported` flag. Under N concurrent eligible
    /// reveals exactly one caller sees `true` and runs the report fan-out.
    pub fn claim_inline_report(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE inline_whispers SET reported = 1 WHERE token = ?1 AND reported = 0",
                [token],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Watchers --

    /// Returns false if the pair was already registered.
    pub fn add_watcher(&self, group_id: i64, watcher_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO watchers (group_id, watcher_id) VALUES (?1, ?2)",
                rusqlite::params![group_id, watcher_id],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn remove_watcher(&self, group_id: i64, watcher_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM watchers WHERE group_id = ?1 AND watcher_id = ?2",
                rusqlite::params![group_id, watcher_id],
            )?;
            Ok(removed == 1)
        })
    }

    pub fn watchers_for(&self, group_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT watcher_id FROM watchers WHERE group_id = ?1")?;
            let ids = stmt
                .query_map([group_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    // -- Admin sessions --

    /// Arm a pending admin action (e.g. which broadcast audience to use).
    /// Durable so a restart does not leave the administrator in a limbo mode.
    pub fn set_admin_session(&self, admin_id: i64, pending_action: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO admin_sessions (admin_id, pending_action) VALUES (?1, ?2)
                 ON CONFLICT (admin_id) DO UPDATE SET pending_action = excluded.pending_action",
                rusqlite::params![admin_id, pending_action],
            )?;
            Ok(())
        })
    }

    /// Read and clear the pending admin action in one statement.
    pub fn take_admin_session(&self, admin_id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "DELETE FROM admin_sessions WHERE admin_id = ?1 RETURNING pending_action",
                [admin_id],
                |row| row.get(0),
            )
            .optional()
        })
    }
}

fn collect_ids(conn: &Connection, sql: &str) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn map_whisper_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WhisperRow> {
    Ok(WhisperRow {
        id: row.get(0)?,
        group_id: row.get(1)?,
        sender_id: row.get(2)?,
        receiver_id: row.get(3)?,
        body: row.get(4)?,
        status: row.get(5)?,
        delivery_message_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use std::sync::Arc;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn pending_upsert_keeps_one_row_per_sender() {
        let db = db();
        let now = Utc::now();
        let expires = now + TimeDelta::seconds(180);

        db.upsert_pending(1, -100, 2, now, expires).unwrap();
        db.set_pending_guide(1, 555).unwrap();
        // second trigger from the same sender overwrites, clearing the guide ref
        db.upsert_pending(1, -200, 3, now, expires).unwrap();

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM pending", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);

        let row = db.consume_pending(1).unwrap().unwrap();
        assert_eq!(row.group_id, -200);
        assert_eq!(row.receiver_id, 3);
        assert_eq!(row.guide_message_id, None);
    }

    #[test]
    fn consume_pending_succeeds_exactly_once() {
        let db = db();
        let now = Utc::now();
        db.upsert_pending(1, -100, 2, now, now + TimeDelta::seconds(180))
            .unwrap();

        assert!(db.consume_pending(1).unwrap().is_some());
        assert!(db.consume_pending(1).unwrap().is_none());
    }

    #[test]
    fn pending_expiry_is_checked_lazily() {
        let db = db();
        let now = Utc::now();
        db.upsert_pending(1, -100, 2, now - TimeDelta::seconds(240), now - TimeDelta::seconds(60))
            .unwrap();

        // The stale row is still there until someone reads it.
        let row = db.consume_pending(1).unwrap().unwrap();
        assert!(row.is_expired(now));
    }

    #[test]
    fn whisper_dedup_ignores_identical_content() {
        let db = db();
        let now = Utc::now();

        let first = db.insert_whisper_dedup(-100, 1, 2, "hello", now).unwrap();
        assert!(first.is_some());
        let second = db.insert_whisper_dedup(-100, 1, 2, "hello", now).unwrap();
        assert!(second.is_none());
        // different body is a different whisper
        let third = db.insert_whisper_dedup(-100, 1, 2, "hello again", now).unwrap();
        assert!(third.is_some());
    }

    #[test]
    fn whisper_status_flips_once() {
        let db = db();
        let now = Utc::now();
        let id = db.insert_whisper(-100, 1, 2, "psst", Some(9), now).unwrap();

        db.mark_whisper_read(id).unwrap();
        let row = db.get_whisper(-100, 1, 2).unwrap().unwrap();
        assert_eq!(row.status, "read");

        // idempotent on repeat
        db.mark_whisper_read(id).unwrap();
        let row = db.get_whisper(-100, 1, 2).unwrap().unwrap();
        assert_eq!(row.status, "read");
    }

    #[test]
    fn get_whisper_returns_latest_for_key() {
        let db = db();
        let now = Utc::now();
        db.insert_whisper(-100, 1, 2, "first", None, now).unwrap();
        db.insert_whisper(-100, 1, 2, "second", None, now).unwrap();

        let row = db.get_whisper(-100, 1, 2).unwrap().unwrap();
        assert_eq!(row.body, "second");
    }

    #[test]
    fn inline_report_claim_is_exactly_once_under_contention() {
        let db = Arc::new(db());
        let now = Utc::now();
        db.insert_inline_whisper("tok", 1, "carol", "hi", now, now + TimeDelta::seconds(180))
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = Arc::clone(&db);
            handles.push(std::thread::spawn(move || {
                db.claim_inline_report("tok").unwrap()
            }));
        }
        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(wins, 1);

        let row = db.get_inline_whisper("tok").unwrap().unwrap();
        assert!(row.reported);
    }

    #[test]
    fn inline_whisper_username_is_stored_lowercase() {
        let db = db();
        let now = Utc::now();
        db.insert_inline_whisper("tok", 1, "CaRoL", "hi", now, now + TimeDelta::seconds(180))
            .unwrap();
        let row = db.get_inline_whisper("tok").unwrap().unwrap();
        assert_eq!(row.receiver_username, "carol");
    }

    #[test]
    fn watcher_set_round_trips() {
        let db = db();
        assert!(db.add_watcher(-100, 7).unwrap());
        assert!(!db.add_watcher(-100, 7).unwrap());
        assert!(db.add_watcher(-100, 8).unwrap());
        assert!(db.add_watcher(-200, 7).unwrap());

        let mut watchers = db.watchers_for(-100).unwrap();
        watchers.sort();
        assert_eq!(watchers, vec![7, 8]);

        assert!(db.remove_watcher(-100, 7).unwrap());
        assert!(!db.remove_watcher(-100, 7).unwrap());
        assert_eq!(db.watchers_for(-100).unwrap(), vec![8]);
    }

    #[test]
    fn admin_session_is_taken_once() {
        let db = db();
        db.set_admin_session(1, "broadcast:all").unwrap();
        db.set_admin_session(1, "broadcast:groups").unwrap();

        assert_eq!(
            db.take_admin_session(1).unwrap().as_deref(),
            Some("broadcast:groups")
        );
        assert_eq!(db.take_admin_session(1).unwrap(), None);
    }

    #[test]
    fn identity_cache_upserts_and_falls_back() {
        let db = db();
        let now = Utc::now();
        assert_eq!(db.display_name(42).unwrap(), None);

        db.upsert_user(42, Some("alice"), "Alice", now).unwrap();
        db.upsert_user(42, None, "Alice B.", now).unwrap();
        assert_eq!(db.display_name(42).unwrap().as_deref(), Some("Alice B."));

        db.upsert_chat(-100, Some("Chess Club"), "supergroup", now)
            .unwrap();
        db.upsert_chat(-200, None, "group", now).unwrap();
        assert_eq!(db.chat_title(-100).unwrap().as_deref(), Some("Chess Club"));
        assert_eq!(db.chat_title(-200).unwrap(), None);

        let groups = db.list_groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(db.all_group_ids().unwrap().len(), 2);
        assert_eq!(db.all_user_ids().unwrap(), vec![42]);
    }
}
