use crate::Database;
use crate::models::{NoteRow, ts_to_sql};
use anyhow::Result;
use chrono::{DateTime, Utc};
use jot_types::api::UpdateNoteRequest;
use jot_types::models::Note;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

const NOTE_COLUMNS: &str =
    "id, owner, title, body, created_at, remind_at, delivered, delivered_at";

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        created_at: row.get(4)?,
        remind_at: row.get(5)?,
        delivered: row.get(6)?,
        delivered_at: row.get(7)?,
    })
}

impl Database {
    /// Insert a note. The store assigns the id and creation time.
    pub fn insert_note(
        &self,
        owner: &str,
        title: &str,
        body: &str,
        remind_at: Option<DateTime<Utc>>,
    ) -> Result<Note> {
        let note = Note {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
            remind_at,
            delivered: false,
            delivered_at: None,
        };

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO notes (id, owner, title, body, created_at, remind_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    note.id.to_string(),
                    note.owner,
                    note.title,
                    note.body,
                    ts_to_sql(note.created_at),
                    note.remind_at.map(ts_to_sql),
                ],
            )?;
            Ok(())
        })?;

        Ok(note)
    }

    /// Point lookup, scoped to the owner. A note owned by someone else
    /// is indistinguishable from a missing one.
    pub fn get_note(&self, id: Uuid, owner: &str) -> Result<Option<Note>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1 AND owner = ?2"),
                    params![id.to_string(), owner],
                    note_from_row,
                )
                .optional()?;
            row.map(NoteRow::into_note).transpose()
        })
    }

    /// All of a user's notes, newest first.
    pub fn list_notes(&self, owner: &str) -> Result<Vec<Note>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes WHERE owner = ?1 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([owner], note_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(NoteRow::into_note).collect()
        })
    }

    /// Undelivered notes whose reminder time has passed.
    pub fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Note>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes
                 WHERE remind_at IS NOT NULL AND remind_at <= ?1 AND delivered = 0
                 ORDER BY remind_at"
            ))?;
            let rows = stmt
                .query_map([ts_to_sql(now)], note_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(NoteRow::into_note).collect()
        })
    }

    /// Partial update of the mutable fields. `remind_at` is tri-state:
    /// absent keeps the stored value, null clears it, a value sets it.
    /// Delivery state and ownership are not reachable through this path.
    pub fn update_note(
        &self,
        id: Uuid,
        owner: &str,
        patch: &UpdateNoteRequest,
    ) -> Result<Option<Note>> {
        self.with_conn_mut(|conn| {
            let current = conn
                .query_row(
                    &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1 AND owner = ?2"),
                    params![id.to_string(), owner],
                    note_from_row,
                )
                .optional()?;

            let Some(current) = current else {
                return Ok(None);
            };
            let mut note = current.into_note()?;

            if let Some(title) = &patch.title {
                note.title = title.clone();
            }
            if let Some(body) = &patch.body {
                note.body = body.clone();
            }
            if let Some(remind_at) = patch.remind_at {
                note.remind_at = remind_at;
            }

            conn.execute(
                "UPDATE notes SET title = ?3, body = ?4, remind_at = ?5
                 WHERE id = ?1 AND owner = ?2",
                params![
                    id.to_string(),
                    owner,
                    note.title,
                    note.body,
                    note.remind_at.map(ts_to_sql),
                ],
            )?;

            Ok(Some(note))
        })
    }

    pub fn delete_note(&self, id: Uuid, owner: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM notes WHERE id = ?1 AND owner = ?2",
                params![id.to_string(), owner],
            )?;
            Ok(deleted > 0)
        })
    }

    /// One-way pending -> delivered transition. Returns true iff this
    /// call performed it; a second caller always sees false. This is the
    /// dedup backstop for overlapping scan runs and create-time delivery.
    pub fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE notes SET delivered = 1, delivered_at = ?2
                 WHERE id = ?1 AND delivered = 0",
                params![id.to_string(), ts_to_sql(at)],
            )?;
            Ok(changed == 1)
        })
    }
}
