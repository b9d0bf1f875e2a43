//! Live snapshot subscriptions.
//!
//! A [`Subscription`] owns the background task that watches for changes.
//! Dropping the handle aborts the task, so a subscription can never outlive
//! the scope that opened it.

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::document::StoreChange;
use crate::error::Result;

/// Snapshots buffered between the watcher task and the consumer.
const SNAPSHOT_BUFFER: usize = 16;

pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> Subscription<T> {
    /// Wait for the next snapshot.  `None` once the watcher has stopped.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`Subscription::next`].
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop watching.  Equivalent to dropping the handle.
    pub fn cancel(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a watcher that delivers `load()` once immediately and again after
/// every change equal to `key`.
///
/// `changes` must be obtained before calling so no write between subscribe
/// and the first load is missed.
pub(crate) fn watch<T, F>(
    mut changes: broadcast::Receiver<StoreChange>,
    key: StoreChange,
    load: F,
) -> Subscription<T>
where
    T: Send + 'static,
    F: Fn() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);

    let task = tokio::spawn(async move {
        debug!(key = ?key, "subscription opened");

        match load() {
            Ok(snapshot) => {
                if tx.send(snapshot).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!(key = ?key, error = %e, "initial snapshot failed"),
        }

        loop {
            match changes.recv().await {
                Ok(change) if change == key => {}
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Missed notifications may include ours; reload.
                    debug!(key = ?key, skipped, "change feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }

            match load() {
                Ok(snapshot) => {
                    if tx.send(snapshot).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(key = ?key, error = %e, "snapshot reload failed"),
            }
        }

        debug!(key = ?key, "subscription closed");
    });

    Subscription { rx, task }
}
