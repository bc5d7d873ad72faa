//! Database row types — these map directly to SQLite rows.
//! Distinct from the jot-types wire model to keep the DB layer independent.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use jot_types::models::Note;

pub struct NoteRow {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub body: String,
    pub created_at: String,
    pub remind_at: Option<String>,
    pub delivered: bool,
    pub delivered_at: Option<String>,
}

impl NoteRow {
    pub fn into_note(self) -> Result<Note> {
        Ok(Note {
            id: self.id.parse().context("bad note id")?,
            owner: self.owner,
            title: self.title,
            body: self.body,
            created_at: ts_from_sql(&self.created_at)?,
            remind_at: self.remind_at.as_deref().map(ts_from_sql).transpose()?,
            delivered: self.delivered,
            delivered_at: self.delivered_at.as_deref().map(ts_from_sql).transpose()?,
        })
    }
}

/// Fixed-width RFC 3339 so that lexicographic TEXT comparison in SQL
/// matches chronological order.
pub fn ts_to_sql(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn ts_from_sql(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("bad timestamp in db: {s}"))?
        .with_timezone(&Utc))
}
