use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS notes (
            id            TEXT PRIMARY KEY,
            owner         TEXT NOT NULL,
            title         TEXT NOT NULL,
            body          TEXT NOT NULL,
            created_at    TEXT NOT NULL,
            remind_at     TEXT,
            delivered     INTEGER NOT NULL DEFAULT 0,
            delivered_at  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_notes_owner
            ON notes(owner, created_at);

        -- The scanner only ever looks at undelivered reminders.
        CREATE INDEX IF NOT EXISTS idx_notes_due
            ON notes(remind_at) WHERE delivered = 0;
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
