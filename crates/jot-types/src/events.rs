use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events pushed to clients over the notification stream.
///
/// These go out as unnamed SSE events; the JSON payload carries the
/// `type` tag. Forced termination is a separate named `close` event
/// (see [`CloseReason`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PushEvent {
    /// First event on every stream: the channel is registered and live.
    #[serde(rename_all = "camelCase")]
    Connected {
        /// Hint for how long the client should expect this connection to
        /// live before it must reconnect.
        reconnect_after_secs: u64,
        at: DateTime<Utc>,
    },

    /// A reminder came due.
    #[serde(rename_all = "camelCase")]
    NoteDue {
        id: Uuid,
        title: String,
        body: String,
    },
}

/// Why the server is force-closing a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseReason {
    /// A newer connection for the same user replaced this one.
    Replaced,
    /// The connection outlived its time-to-live.
    Ttl,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replaced => "replaced",
            Self::Ttl => "ttl",
        }
    }
}

/// Payload of the named `close` SSE event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosePayload {
    pub reason: CloseReason,
}

/// What travels over a channel between the registry and a stream task.
#[derive(Debug, Clone)]
pub enum StreamFrame {
    Event(PushEvent),
    /// Emit a `close` event and terminate the stream.
    Close(CloseReason),
}
