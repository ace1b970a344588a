use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            user_id     INTEGER PRIMARY KEY,
            username    TEXT,
            first_name  TEXT NOT NULL,
            last_seen   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chats (
            chat_id     INTEGER PRIMARY KEY,
            title       TEXT,
            kind        TEXT NOT NULL,
            last_seen   TEXT NOT NULL
        );

        -- At most one whisper intent in flight per sender.
        CREATE TABLE IF NOT EXISTS pending (
            sender_id         INTEGER PRIMARY KEY,
            group_id          INTEGER NOT NULL,
            receiver_id       INTEGER NOT NULL,
            created_at        TEXT NOT NULL,
            expires_at        TEXT NOT NULL,
            guide_message_id  INTEGER
        );

        -- Delivered whispers. Audit trail: rows are never deleted.
        CREATE TABLE IF NOT EXISTS whispers (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id             INTEGER NOT NULL,
            sender_id            INTEGER NOT NULL,
            receiver_id          INTEGER NOT NULL,
            body                 TEXT NOT NULL,
            status               TEXT NOT NULL CHECK (status IN ('sent', 'read')),
            delivery_message_id  INTEGER,
            created_at           TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_whispers_content
            ON whispers(group_id, sender_id, receiver_id, body);

        -- Inline-path whispers, keyed by unguessable token. The receiver is
        -- known only by username until an eligible viewer clicks reveal.
        CREATE TABLE IF NOT EXISTS inline_whispers (
            token              TEXT PRIMARY KEY,
            sender_id          INTEGER NOT NULL,
            receiver_username  TEXT NOT NULL,
            body               TEXT NOT NULL,
            created_at         TEXT NOT NULL,
            expires_at         TEXT NOT NULL,
            reported           INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS watchers (
            group_id    INTEGER NOT NULL,
            watcher_id  INTEGER NOT NULL,
            PRIMARY KEY (group_id, watcher_id)
        );

        CREATE TABLE IF NOT EXISTS admin_sessions (
            admin_id        INTEGER PRIMARY KEY,
            pending_action  TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
