use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use jot_types::events::{CloseReason, PushEvent, StreamFrame};

/// One open push channel: the sending half of the mpsc pair feeding a
/// stream task, plus an id so multiple channels for the same user can be
/// told apart.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    pub id: Uuid,
    tx: mpsc::UnboundedSender<StreamFrame>,
}

impl ChannelHandle {
    pub fn new(tx: mpsc::UnboundedSender<StreamFrame>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx,
        }
    }

    /// Ask the owning stream task to emit a `close` event and terminate.
    /// Best-effort: the task may already be gone.
    pub fn close(&self, reason: CloseReason) {
        let _ = self.tx.send(StreamFrame::Close(reason));
    }

    fn send(&self, event: PushEvent) -> Result<(), ()> {
        self.tx.send(StreamFrame::Event(event)).map_err(|_| ())
    }
}

/// What happened to a single delivery attempt across a user's channels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    /// Channels whose transport was already gone; they were removed
    /// from the registry as a side effect.
    pub failed: usize,
}

/// In-memory map of user identity -> open push channels.
///
/// Explicitly constructed and injected (no module-level singleton) so
/// tests can run against fresh instances. Cloning shares the same map.
///
/// Membership mutation is a short synchronous critical section; delivery
/// iterates over a snapshot taken under the read lock, so removing a
/// channel mid-delivery never skips or duplicates a live one.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<HashMap<String, Vec<ChannelHandle>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a channel into the user's set, creating the set if absent.
    /// The single-active-channel policy is the endpoint handler's job,
    /// not the registry's.
    pub fn add(&self, user: &str, handle: ChannelHandle) {
        let mut map = self.inner.write().expect("registry lock poisoned");
        map.entry(user.to_string()).or_default().push(handle);
    }

    /// Remove one channel. Idempotent: removing an absent channel is a
    /// no-op, so every termination path may call this safely. An entry
    /// that becomes empty is dropped immediately.
    pub fn remove(&self, user: &str, channel_id: Uuid) {
        let mut map = self.inner.write().expect("registry lock poisoned");
        if let Some(channels) = map.get_mut(user) {
            channels.retain(|c| c.id != channel_id);
            if channels.is_empty() {
                map.remove(user);
            }
        }
    }

    /// Atomically swap the user's channel set for a single new channel,
    /// returning the handles that were displaced. Removal and insertion
    /// happen under one write lock, so two concurrent connects for the
    /// same user can never both stay admitted — one of them is always
    /// displaced. The caller tells each returned handle to close.
    pub fn replace(&self, user: &str, handle: ChannelHandle) -> Vec<ChannelHandle> {
        let mut map = self.inner.write().expect("registry lock poisoned");
        map.insert(user.to_string(), vec![handle]).unwrap_or_default()
    }

    /// Write an event to every channel currently registered for a user.
    /// A dead channel is removed and never aborts delivery to the rest.
    /// Zero registered channels is a successful no-op.
    pub fn deliver(&self, user: &str, event: &PushEvent) -> DeliveryReport {
        // Snapshot under the read lock; sends happen outside it.
        let snapshot: Vec<ChannelHandle> = {
            let map = self.inner.read().expect("registry lock poisoned");
            match map.get(user) {
                Some(channels) => channels.clone(),
                None => return DeliveryReport::default(),
            }
        };

        let mut report = DeliveryReport::default();
        for channel in &snapshot {
            match channel.send(event.clone()) {
                Ok(()) => report.sent += 1,
                Err(()) => {
                    debug!(user, channel = %channel.id, "push channel dead, removing");
                    self.remove(user, channel.id);
                    report.failed += 1;
                }
            }
        }
        report
    }

    pub fn channel_count(&self, user: &str) -> usize {
        let map = self.inner.read().expect("registry lock poisoned");
        map.get(user).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (ChannelHandle, mpsc::UnboundedReceiver<StreamFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelHandle::new(tx), rx)
    }

    fn due_event() -> PushEvent {
        PushEvent::NoteDue {
            id: Uuid::new_v4(),
            title: "t".into(),
            body: "b".into(),
        }
    }

    #[test]
    fn deliver_to_unknown_user_is_a_noop() {
        let registry = Registry::new();
        assert_eq!(registry.deliver("nobody", &due_event()), DeliveryReport::default());
    }

    #[test]
    fn deliver_reaches_all_channels() {
        let registry = Registry::new();
        let (a, mut rx_a) = handle();
        let (b, mut rx_b) = handle();
        registry.add("alice", a);
        registry.add("alice", b);

        let report = registry.deliver("alice", &due_event());
        assert_eq!(report, DeliveryReport { sent: 2, failed: 0 });
        assert!(matches!(rx_a.try_recv(), Ok(StreamFrame::Event(_))));
        assert!(matches!(rx_b.try_recv(), Ok(StreamFrame::Event(_))));
    }

    #[test]
    fn dead_channel_is_removed_without_aborting_the_batch() {
        let registry = Registry::new();
        let (dead, rx_dead) = handle();
        let (live, mut rx_live) = handle();
        registry.add("alice", dead);
        registry.add("alice", live);
        drop(rx_dead);

        let report = registry.deliver("alice", &due_event());
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert!(matches!(rx_live.try_recv(), Ok(StreamFrame::Event(_))));
        // only the live channel remains
        assert_eq!(registry.channel_count("alice"), 1);
    }

    #[test]
    fn remove_is_idempotent_and_drops_empty_entries() {
        let registry = Registry::new();
        let (a, _rx) = handle();
        let id = a.id;
        registry.add("alice", a);

        registry.remove("alice", id);
        assert_eq!(registry.channel_count("alice"), 0);
        // second removal from another termination path is fine
        registry.remove("alice", id);
        // entry is gone entirely, not left as an empty set
        assert!(registry.inner.read().unwrap().get("alice").is_none());
    }

    #[test]
    fn replace_displaces_all_prior_channels() {
        let registry = Registry::new();
        let (a, mut rx_a) = handle();
        let (b, _rx_b) = handle();
        registry.add("alice", a);
        registry.add("alice", b);

        let (new, mut rx_new) = handle();
        let displaced = registry.replace("alice", new);
        assert_eq!(displaced.len(), 2);
        assert_eq!(registry.channel_count("alice"), 1);

        // displaced handles can still be told to close
        displaced[0].close(CloseReason::Replaced);
        assert!(matches!(
            rx_a.try_recv(),
            Ok(StreamFrame::Close(CloseReason::Replaced))
        ));

        // delivery now reaches only the replacement channel
        let report = registry.deliver("alice", &due_event());
        assert_eq!(report, DeliveryReport { sent: 1, failed: 0 });
        assert!(matches!(rx_new.try_recv(), Ok(StreamFrame::Event(_))));
    }

    #[test]
    fn concurrent_replacements_admit_exactly_one_channel() {
        let registry = Registry::new();

        // simultaneous reconnects for the same user racing each other
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let (tx, rx) = mpsc::unbounded_channel();
                    let displaced = registry.replace("alice", ChannelHandle::new(tx));
                    for old in &displaced {
                        old.close(CloseReason::Replaced);
                    }
                    (displaced.len(), rx)
                })
            })
            .collect();
        let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        // 8 connects, one survivor: every other channel was displaced by
        // somebody and told why
        assert_eq!(results.iter().map(|(n, _)| *n).sum::<usize>(), 7);
        assert_eq!(registry.channel_count("alice"), 1);

        let mut closed = 0;
        let mut live = 0;
        for (_, mut rx) in results {
            match rx.try_recv() {
                Ok(StreamFrame::Close(CloseReason::Replaced)) => closed += 1,
                Err(_) => live += 1,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
        assert_eq!((closed, live), (7, 1));
    }

    #[test]
    fn delivery_to_one_user_never_touches_another() {
        let registry = Registry::new();
        let (a, mut rx_a) = handle();
        let (b, mut rx_b) = handle();
        registry.add("alice", a);
        registry.add("bob", b);

        registry.deliver("alice", &due_event());
        assert!(matches!(rx_a.try_recv(), Ok(StreamFrame::Event(_))));
        assert!(rx_b.try_recv().is_err());
    }
}
