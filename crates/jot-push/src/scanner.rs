use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use jot_db::Database;

use crate::notifier::Notifier;

/// Recurring task that discovers due reminders and hands them to the
/// notifier.
///
/// Owned by the process lifecycle: `spawn` starts it, the returned
/// handle cancels and awaits it on shutdown, so test harnesses can
/// start and stop the subsystem repeatedly. Runs are not locked against
/// each other; the notifier's conditional mark-delivered is the
/// correctness backstop if ticks ever overlap.
pub struct Scanner;

pub struct ScannerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Scanner {
    pub fn spawn(db: Arc<Database>, notifier: Notifier, period: Duration) -> ScannerHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            info!("reminder scanner running every {period:?}");

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => scan_once(&db, &notifier),
                }
            }
            debug!("reminder scanner stopped");
        });

        ScannerHandle { cancel, task }
    }
}

/// One scan cycle. A store error abandons the cycle; the next tick
/// retries from scratch — the only backlog state is the `delivered`
/// flag already persisted on each note.
fn scan_once(db: &Database, notifier: &Notifier) {
    let due = match db.find_due(Utc::now()) {
        Ok(due) => due,
        Err(e) => {
            warn!("due-reminder query failed, retrying next cycle: {e:#}");
            return;
        }
    };

    for note in &due {
        notifier.deliver_due_logged(note);
    }
}

impl ScannerHandle {
    /// Cancel the timer and wait for the task to wind down.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
