use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted note. `delivered`/`delivered_at` form a one-way state
/// machine: pending (delivered=false) -> delivered (delivered=true,
/// delivered_at set). The transition never reverts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    /// Verified user id from the identity provider. Immutable.
    pub owner: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub remind_at: Option<DateTime<Utc>>,
    pub delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Note {
    /// A note is due when its reminder time has passed and it has not
    /// been delivered. Notes without a reminder are never due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.delivered && self.remind_at.is_some_and(|t| t <= now)
    }
}
