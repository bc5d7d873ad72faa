use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use jot_types::api::{CreateNoteRequest, DeleteResponse, UpdateNoteRequest};

use crate::auth::{AppState, Identity};
use crate::error::ApiError;

/// POST /notes — create a note. A reminder that is already past when
/// the note lands is delivered immediately rather than waiting for the
/// next scanner tick.
pub async fn create_note(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".into()));
    }

    let note = state
        .db
        .insert_note(&identity.user_id, &req.title, &req.body, req.remind_at)?;

    if note.is_due(Utc::now()) {
        // best effort: a failed mark stays pending and the scanner retries
        state.notifier.deliver_due_logged(&note);
    }

    Ok((StatusCode::CREATED, Json(note)))
}

/// GET /notes — the caller's notes, newest first.
pub async fn list_notes(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let notes = state.db.list_notes(&identity.user_id)?;
    Ok(Json(notes))
}

/// GET /notes/{id} — a note owned by someone else is a 404, never a 403.
pub async fn get_note(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state
        .db
        .get_note(id, &identity.user_id)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(note))
}

/// PUT /notes/{id} — partial update of title/body/remindAt. Delivery
/// state is not editable; a delivered note whose reminder is moved back
/// into the past stays delivered (one-shot reminders).
pub async fn update_note(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let note = if patch.is_empty() {
        state.db.get_note(id, &identity.user_id)?
    } else {
        state.db.update_note(id, &identity.user_id, &patch)?
    };

    let note = note.ok_or(ApiError::NotFound)?;
    Ok(Json(note))
}

/// DELETE /notes/{id}
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.db.delete_note(id, &identity.user_id)? {
        return Err(ApiError::NotFound);
    }
    Ok(Json(DeleteResponse {
        message: "Note deleted".into(),
    }))
}
