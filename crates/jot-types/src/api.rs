use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// -- Notes --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateNoteRequest {
    pub title: String,
    pub body: String,
    pub remind_at: Option<DateTime<Utc>>,
}

/// Partial update. Absent fields are left untouched; `remindAt` is
/// tri-state (absent = keep, null = clear, value = set).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub remind_at: Option<Option<DateTime<Utc>>>,
}

impl UpdateNoteRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.remind_at.is_none()
    }
}

/// Distinguishes a field that is present-but-null from one that is
/// absent. Serde collapses both to `None` by default.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

// -- Errors --

/// Structured error body returned by every non-2xx JSON response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
