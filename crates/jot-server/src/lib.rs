use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use jot_api::auth::{AppState, AppStateInner, Verifier};
use jot_api::middleware::require_auth;
use jot_api::{notes, notifications};
use jot_db::Database;
use jot_push::notifier::Notifier;
use jot_push::registry::Registry;

pub const GOOGLE_TOKENINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/tokeninfo";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub tokeninfo_url: String,
    pub scan_interval: Duration,
    pub stream_ttl: Duration,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: std::env::var("JOT_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("JOT_PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            db_path: std::env::var("JOT_DB_PATH").unwrap_or_else(|_| "jot.db".into()),
            tokeninfo_url: std::env::var("JOT_TOKENINFO_URL")
                .unwrap_or_else(|_| GOOGLE_TOKENINFO_URL.into()),
            scan_interval: Duration::from_secs(
                std::env::var("JOT_SCAN_INTERVAL_SECS")
                    .unwrap_or_else(|_| "5".into())
                    .parse()?,
            ),
            stream_ttl: Duration::from_secs(
                std::env::var("JOT_STREAM_TTL_SECS")
                    .unwrap_or_else(|_| "20".into())
                    .parse()?,
            ),
            cors_origins: std::env::var("JOT_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

/// Assemble the shared state. The registry and notifier are explicit
/// instances with no global fallback, so tests can build as many
/// isolated stacks as they like.
pub fn build_state(
    db: Arc<Database>,
    verifier: Verifier,
    stream_ttl: Duration,
) -> (AppState, Registry, Notifier) {
    let registry = Registry::new();
    let notifier = Notifier::new(registry.clone(), db.clone());

    let state: AppState = Arc::new(AppStateInner {
        db,
        registry: registry.clone(),
        notifier: notifier.clone(),
        verifier,
        stream_ttl,
    });

    (state, registry, notifier)
}

pub fn app(state: AppState, cors: CorsLayer) -> Router {
    let protected_routes = Router::new()
        .route("/notes", post(notes::create_note))
        .route("/notes", get(notes::list_notes))
        .route("/notes/{id}", get(notes::get_note))
        .route("/notes/{id}", put(notes::update_note))
        .route("/notes/{id}", delete(notes::delete_note))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    // The stream does its own opening-state auth (query-param tokens).
    let stream_route = Router::new()
        .route("/notifications/stream", get(notifications::stream))
        .with_state(state);

    Router::new()
        .merge(protected_routes)
        .merge(stream_route)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let parsed = origins
        .iter()
        .map(|o| o.parse())
        .collect::<Result<Vec<axum::http::HeaderValue>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any))
}
