#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router, extract::Query};
use serde_json::json;

use jot_api::auth::Verifier;
use jot_db::Database;
use jot_push::notifier::Notifier;
use jot_push::registry::Registry;
use jot_server::{app, build_state, cors_layer};

pub struct TestServer {
    pub base: String,
    pub db: Arc<Database>,
    pub registry: Registry,
    pub notifier: Notifier,
    pub client: reqwest::Client,
}

/// Stub identity provider: any token of the form `tok-<user>` verifies
/// as `<user>`; everything else is rejected like Google's tokeninfo
/// rejects an expired or bogus access token.
async fn tokeninfo(Query(q): Query<HashMap<String, String>>) -> axum::response::Response {
    match q.get("access_token").and_then(|t| t.strip_prefix("tok-")) {
        Some(user) => Json(json!({
            "sub": user,
            "email": format!("{user}@example.com"),
        }))
        .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_token" })),
        )
            .into_response(),
    }
}

/// Boot a full stack on ephemeral ports: stub identity provider,
/// in-memory store, fresh registry. Each call is fully isolated.
pub async fn spawn_app(stream_ttl: Duration) -> TestServer {
    let idp_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let idp_addr = idp_listener.local_addr().unwrap();
    let idp = Router::new().route("/tokeninfo", get(tokeninfo));
    tokio::spawn(async move {
        axum::serve(idp_listener, idp).await.unwrap();
    });

    let db = Arc::new(Database::open_in_memory().unwrap());
    let verifier = Verifier::new(format!("http://{idp_addr}/tokeninfo"));
    let (state, registry, notifier) = build_state(db.clone(), verifier, stream_ttl);
    let router = app(state, cors_layer(&[]).unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        base: format!("http://{addr}"),
        db,
        registry,
        notifier,
        client: reqwest::Client::new(),
    }
}

pub fn bearer(user: &str) -> String {
    format!("Bearer tok-{user}")
}

// -- Minimal SSE reader over reqwest --

pub struct SseEvent {
    /// `None` for unnamed (default) events.
    pub name: Option<String>,
    pub data: serde_json::Value,
}

pub struct SseClient {
    response: reqwest::Response,
    buf: String,
}

impl SseClient {
    /// Open the notification stream with a bearer header.
    pub async fn connect(server: &TestServer, user: &str) -> SseClient {
        let response = server
            .client
            .get(format!("{}/notifications/stream", server.base))
            .header("Authorization", bearer(user))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        SseClient {
            response,
            buf: String::new(),
        }
    }

    /// Open the stream the way a browser `EventSource` has to: token in
    /// the query string.
    pub async fn connect_via_query(server: &TestServer, user: &str) -> SseClient {
        let response = server
            .client
            .get(format!(
                "{}/notifications/stream?access_token=tok-{user}",
                server.base
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        SseClient {
            response,
            buf: String::new(),
        }
    }

    /// Next parsed event, or `None` once the server closes the stream.
    pub async fn next_event(&mut self) -> Option<SseEvent> {
        loop {
            if let Some(idx) = self.buf.find("\n\n") {
                let raw: String = self.buf.drain(..idx + 2).collect();
                if let Some(event) = parse_event(raw.trim_end()) {
                    return Some(event);
                }
                continue;
            }
            match self.response.chunk().await.ok()? {
                Some(chunk) => self.buf.push_str(std::str::from_utf8(&chunk).unwrap()),
                None => return None,
            }
        }
    }

    /// Like `next_event` but failing loudly instead of hanging forever.
    pub async fn expect_event(&mut self) -> SseEvent {
        tokio::time::timeout(Duration::from_secs(5), self.next_event())
            .await
            .expect("timed out waiting for SSE event")
            .expect("stream closed while waiting for an event")
    }

    pub async fn expect_closed(&mut self) {
        let ended = tokio::time::timeout(Duration::from_secs(5), self.next_event())
            .await
            .expect("timed out waiting for stream end");
        assert!(ended.is_none(), "expected the stream to be closed");
    }
}

fn parse_event(raw: &str) -> Option<SseEvent> {
    let mut name = None;
    let mut data = String::new();
    for line in raw.lines() {
        if let Some(v) = line.strip_prefix("event:") {
            name = Some(v.trim().to_string());
        } else if let Some(v) = line.strip_prefix("data:") {
            data.push_str(v.trim());
        }
    }
    if data.is_empty() {
        return None;
    }
    Some(SseEvent {
        name,
        data: serde_json::from_str(&data).ok()?,
    })
}
