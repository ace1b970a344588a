//! Ephemeral message reaper.
//!
//! A generic delayed-task scheduler: a binary heap keyed by fire time, fed
//! over a channel, draining into a [`MessageDeleter`]. Decoupled from the
//! transport so it can be tested without one. Deletion is best-effort and
//! unordered; tasks are pure cleanup and safe to run even if the target is
//! already gone.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use sotto_telegram::api::TelegramApi;

#[async_trait]
pub trait MessageDeleter: Send + Sync {
    /// Delete a message, returning whether it succeeded. Implementations
    /// handle their own retries; the reaper never re-schedules.
    async fn delete(&self, chat_id: i64, message_id: i64) -> bool;
}

#[async_trait]
impl MessageDeleter for TelegramApi {
    async fn delete(&self, chat_id: i64, message_id: i64) -> bool {
        self.safe_delete(chat_id, message_id).await
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Task {
    fire_at: Instant,
    chat_id: i64,
    message_id: i64,
}

/// Handle for scheduling deletions. Cloneable; the background task stops
/// when every handle is dropped.
#[derive(Clone)]
pub struct Reaper {
    tx: mpsc::UnboundedSender<Task>,
}

impl Reaper {
    pub fn spawn(deleter: Arc<dyn MessageDeleter>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(deleter, rx));
        Self { tx }
    }

    /// Schedule `(chat, message)` for deletion after `delay`.
    pub fn schedule(&self, chat_id: i64, message_id: i64, delay: Duration) {
        let task = Task {
            fire_at: Instant::now() + delay,
            chat_id,
            message_id,
        };
        // Send only fails when the reaper task is gone, i.e. at shutdown;
        // dropping cleanup work then is fine.
        let _ = self.tx.send(task);
    }
}

async fn run(deleter: Arc<dyn MessageDeleter>, mut rx: mpsc::UnboundedReceiver<Task>) {
    let mut heap: BinaryHeap<Reverse<Task>> = BinaryHeap::new();

    loop {
        let next_fire = heap.peek().map(|Reverse(t)| t.fire_at);

        tokio::select! {
            incoming = rx.recv() => match incoming {
                Some(task) => heap.push(Reverse(task)),
                None => {
                    debug!("reaper channel closed, dropping {} queued tasks", heap.len());
                    return;
                }
            },
            _ = tokio::time::sleep_until(next_fire.unwrap_or_else(far_future)),
                if next_fire.is_some() =>
            {
                if let Some(Reverse(task)) = heap.pop() {
                    let deleter = Arc::clone(&deleter);
                    tokio::spawn(async move {
                        if !deleter.delete(task.chat_id, task.message_id).await {
                            debug!(
                                chat_id = task.chat_id,
                                message_id = task.message_id,
                                "scheduled delete did not succeed"
                            );
                        }
                    });
                }
            }
        }
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(3600)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingDeleter {
        deleted: Mutex<Vec<(i64, i64)>>,
    }

    #[async_trait]
    impl MessageDeleter for RecordingDeleter {
        async fn delete(&self, chat_id: i64, message_id: i64) -> bool {
            self.deleted.lock().unwrap().push((chat_id, message_id));
            true
        }
    }

    #[tokio::test]
    async fn fires_tasks_after_their_delay() {
        let deleter = Arc::new(RecordingDeleter {
            deleted: Mutex::new(Vec::new()),
        });
        let reaper = Reaper::spawn(deleter.clone());

        reaper.schedule(-100, 1, Duration::from_millis(20));
        reaper.schedule(-100, 2, Duration::from_millis(5));

        tokio::time::sleep(Duration::from_millis(120)).await;

        let mut deleted = deleter.deleted.lock().unwrap().clone();
        deleted.sort();
        assert_eq!(deleted, vec![(-100, 1), (-100, 2)]);
    }

    #[tokio::test]
    async fn nothing_fires_before_the_delay() {
        let deleter = Arc::new(RecordingDeleter {
            deleted: Mutex::new(Vec::new()),
        });
        let reaper = Reaper::spawn(deleter.clone());

        reaper.schedule(-100, 1, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(deleter.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_deletes_are_silent() {
        struct FailingDeleter;

        #[async_trait]
        impl MessageDeleter for FailingDeleter {
            async fn delete(&self, _chat_id: i64, _message_id: i64) -> bool {
                false
            }
        }

        let reaper = Reaper::spawn(Arc::new(FailingDeleter));
        reaper.schedule(-100, 1, Duration::from_millis(5));
        // nothing to assert beyond "does not panic or loop"
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(reaper);
    }
}
