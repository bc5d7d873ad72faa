use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

use jot_db::Database;
use jot_types::events::PushEvent;
use jot_types::models::Note;

use crate::registry::Registry;

/// Delivers a due reminder: push to the user's live channels, then flip
/// the note to delivered. Shared by the scanner and by note creation
/// when the reminder is already past.
#[derive(Clone)]
pub struct Notifier {
    registry: Registry,
    db: Arc<Database>,
}

impl Notifier {
    pub fn new(registry: Registry, db: Arc<Database>) -> Self {
        Self { registry, db }
    }

    /// Push `noteDue` to every live channel for the note's owner, then
    /// mark the note delivered with a conditional store update.
    ///
    /// The conditional update is the dedup point: when two invocations
    /// race (overlapping scan runs, or create-time delivery racing a
    /// scan), exactly one performs the transition. The loser has nothing
    /// left to do — the event already went out at least once — so it
    /// must not re-push.
    ///
    /// A store failure leaves the note pending; the next scan retries.
    /// Dead channels are the registry's problem and never surface here.
    pub fn deliver_due(&self, note: &Note) -> Result<()> {
        let event = PushEvent::NoteDue {
            id: note.id,
            title: note.title.clone(),
            body: note.body.clone(),
        };

        let report = self.registry.deliver(&note.owner, &event);

        if self.db.mark_delivered(note.id, Utc::now())? {
            info!(
                note = %note.id,
                owner = %note.owner,
                sent = report.sent,
                failed = report.failed,
                "reminder delivered"
            );
        } else {
            debug!(note = %note.id, "already delivered by a racing caller");
        }

        Ok(())
    }

    /// Scanner entry point: per-note errors are logged here so one bad
    /// note never stops the rest of the batch.
    pub fn deliver_due_logged(&self, note: &Note) {
        if let Err(e) = self.deliver_due(note) {
            warn!(note = %note.id, "reminder delivery failed, will retry next scan: {e:#}");
        }
    }
}
