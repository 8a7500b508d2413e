use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            tag         TEXT NOT NULL
                        CHECK (tag IN ('win', 'challenge', 'never-settle', 'upcoming')),
            timestamp   TEXT NOT NULL,
            week_of     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_week
            ON messages(week_of, timestamp);

        CREATE INDEX IF NOT EXISTS idx_messages_user
            ON messages(user_id, timestamp);

        CREATE TABLE IF NOT EXISTS emails (
            id              TEXT PRIMARY KEY,
            kind            TEXT NOT NULL CHECK (kind IN ('weekly', 'monthly')),
            subject         TEXT NOT NULL,
            content         TEXT NOT NULL,
            generated_at    TEXT NOT NULL,
            week_of         TEXT,
            month_of        TEXT,
            raw_message_ids TEXT NOT NULL DEFAULT '[]',
            sections        TEXT NOT NULL DEFAULT '{}'
        );

        CREATE INDEX IF NOT EXISTS idx_emails_generated
            ON emails(generated_at);

        CREATE TABLE IF NOT EXISTS settings (
            key     TEXT PRIMARY KEY,
            value   TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
