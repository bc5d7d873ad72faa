use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use jot_types::api::ErrorBody;

/// Request-path error taxonomy. Everything is recovered at the endpoint
/// boundary and translated to a status code with a JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Auth(String),

    #[error("Note not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::NotFound => (StatusCode::NOT_FOUND, "Note not found".to_string()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Store(e) => {
                error!("store failure: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
