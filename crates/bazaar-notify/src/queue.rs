use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use bazaar_types::notification::NotificationEvent;

use crate::fanout::FanOut;

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationJob {
    pub user_id: Uuid,
    pub event: NotificationEvent,
}

/// Producer half of the notification hand-off. Enqueueing never blocks and
/// never fails the caller; delivery happens on the worker.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<NotificationJob>,
}

impl NotificationQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns false if the worker is gone; the job is dropped and logged.
    pub fn enqueue(&self, user_id: Uuid, event: NotificationEvent) -> bool {
        let kind = event.kind();
        match self.tx.send(NotificationJob { user_id, event }) {
            Ok(()) => {
                debug!("Queued {} notification for {}", kind, user_id);
                true
            }
            Err(_) => {
                warn!("Notification worker gone, dropping {} for {}", kind, user_id);
                false
            }
        }
    }
}

/// Drain the queue into the fan-out until every producer is dropped.
pub async fn run_worker(mut rx: mpsc::UnboundedReceiver<NotificationJob>, fanout: FanOut) {
    while let Some(job) = rx.recv().await {
        let report = fanout.dispatch(job.user_id, &job.event).await;
        debug!("Dispatched {} to {}: {:?}", job.event.kind(), job.user_id, report);
    }
    debug!("Notification worker stopped");
}
