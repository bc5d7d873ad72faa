use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use serde::Deserialize;

use jot_push::stream::open_user_stream;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::bearer_token;

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    /// `EventSource` cannot set request headers, so the stream endpoint
    /// also accepts the access token as a query parameter.
    access_token: Option<String>,
}

/// GET /notifications/stream — open a push channel.
///
/// Identity is verified here, in the opening state, rather than by the
/// shared middleware: a rejected credential must never reach the
/// registry, and the token may arrive via query parameter. After
/// verification the connection lifecycle (replacement of prior
/// channels, TTL, cleanup) is jot-push's business.
pub async fn stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<StreamParams>,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers)
        .or(params.access_token)
        .ok_or_else(|| ApiError::Auth("Missing access token".into()))?;

    let identity = state.verifier.verify(&token).await?;

    Ok(open_user_stream(
        state.registry.clone(),
        identity.user_id,
        state.stream_ttl,
    ))
}
