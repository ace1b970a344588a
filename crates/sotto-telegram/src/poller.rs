//! Long-polling loop for `getUpdates`.
//!
//! Forwards whole [`Update`]s through a channel; classification and handling
//! live upstream. Updates are acknowledged by advancing the offset, and
//! failures back off exponentially.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::TelegramApi;
use crate::types::Update;

/// Run the long-polling loop until the cancellation token fires or the
/// receiving side goes away.
pub async fn poll_loop(
    api: Arc<TelegramApi>,
    poll_timeout: u64,
    update_tx: mpsc::Sender<Update>,
    mut cancel: tokio::sync::watch::Receiver<bool>,
) {
    let mut offset: Option<i64> = None;
    let mut backoff_secs = 1u64;

    info!("poller started");

    loop {
        if *cancel.borrow() {
            info!("poller shutting down");
            return;
        }

        let updates = tokio::select! {
            result = api.get_updates(offset, poll_timeout) => result,
            _ = cancel.changed() => {
                info!("poller cancelled");
                return;
            }
        };

        match updates {
            Ok(updates) => {
                backoff_secs = 1; // Reset backoff on success

                for update in updates {
                    // Advance offset to acknowledge this update
                    offset = Some(update.update_id + 1);

                    if update_tx.send(update).await.is_err() {
                        warn!("update channel closed, stopping poller");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, backoff_secs, "getUpdates failed, backing off");
                tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                backoff_secs = (backoff_secs * 2).min(60);
            }
        }
    }
}
