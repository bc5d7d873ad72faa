use std::convert::Infallible;
use std::time::Duration;

use axum::response::Sse;
use axum::response::sse::Event;
use chrono::Utc;
use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use jot_types::events::{ClosePayload, CloseReason, PushEvent, StreamFrame};

use crate::registry::{ChannelHandle, Registry};

/// Removes the channel from the registry when the stream body is
/// dropped. Client disconnect, transport error, TTL expiry, replacement
/// and normal completion all end up dropping the stream, so every
/// termination path converges on this one cleanup; `Registry::remove`
/// being idempotent makes the convergence safe.
struct ChannelGuard {
    registry: Registry,
    user: String,
    channel_id: Uuid,
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.user, self.channel_id);
        debug!(user = %self.user, channel = %self.channel_id, "push stream closed");
    }
}

/// Open a push stream for an already-verified user.
///
/// Replaces rather than multiplexes: any prior channels for this user
/// are displaced by the same registry operation that admits the new
/// one, then told to close, so there is never a window with two
/// admitted channels.
///
/// The connection carries no heartbeat; a fixed TTL force-closes it and
/// the client reconnects, which bounds the lifetime of stale transports.
pub fn open_user_stream(
    registry: Registry,
    user: String,
    ttl: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(user_event_stream(registry, user, ttl))
}

fn user_event_stream(
    registry: Registry,
    user: String,
    ttl: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = ChannelHandle::new(tx);
    let channel_id = handle.id;

    // One atomic swap: prior channels leave the registry in the same
    // critical section that admits this one, so concurrent connects for
    // the same user can never both stay registered.
    for old in registry.replace(&user, handle) {
        old.close(CloseReason::Replaced);
    }
    info!(user = %user, channel = %channel_id, "push stream opened");

    let guard = ChannelGuard {
        registry,
        user,
        channel_id,
    };

    async_stream::stream! {
        // owned by the stream so dropping the body runs the cleanup
        let _guard = guard;

        let hello = PushEvent::Connected {
            reconnect_after_secs: ttl.as_secs(),
            at: Utc::now(),
        };
        yield Ok(push_event(&hello));

        let deadline = tokio::time::sleep(ttl);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Some(StreamFrame::Event(event)) => yield Ok(push_event(&event)),
                    Some(StreamFrame::Close(reason)) => {
                        yield Ok(close_event(reason));
                        break;
                    }
                    None => break,
                },
                _ = &mut deadline => {
                    yield Ok(close_event(CloseReason::Ttl));
                    break;
                }
            }
        }
    }
}

/// `connected` and `noteDue` go out as unnamed events; the payload
/// carries the type tag.
fn push_event(event: &PushEvent) -> Event {
    Event::default().data(serde_json::to_string(event).unwrap())
}

/// Forced termination is a named `close` event with the reason, sent
/// before the transport drops so the client can drive its reconnect.
fn close_event(reason: CloseReason) -> Event {
    Event::default()
        .event("close")
        .data(serde_json::to_string(&ClosePayload { reason }).unwrap())
}
