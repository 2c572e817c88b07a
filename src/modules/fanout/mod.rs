/// Fan-out Queue
///
/// Side effects of a committed write (real-time broadcast, notification records,
/// push alerts) are handed to bounded queues and drained by background workers,
/// so their latency and failures never reach the request path.
///
/// - Broadcasts and notifications have separate queues and workers; a slow push
///   gateway never delays a broadcast.
/// - Enqueue never blocks. A full or closed queue drops the job with a warning.
/// - Each worker handles jobs one at a time in enqueue order and keeps running
///   after a failed job.
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::modules::{
    message::schema::MessageView, notification::service::MessageNotifier,
    websocket::{broadcaster::Broadcaster, message::ChatEvent},
};

#[derive(Debug, Clone)]
pub struct BroadcastJob {
    pub conversation_id: Uuid,
    pub event: ChatEvent,
    pub skip_user_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct MessageNotice {
    pub message: MessageView,
    pub recipients: Vec<Uuid>,
}

/// Sender half, cloned into every service that produces side effects.
#[derive(Clone)]
pub struct FanoutQueue {
    broadcasts: mpsc::Sender<BroadcastJob>,
    notices: mpsc::Sender<MessageNotice>,
}

/// Receiver half, consumed once by [`FanoutWorkers::spawn`].
pub struct FanoutWorkers {
    broadcasts: mpsc::Receiver<BroadcastJob>,
    notices: mpsc::Receiver<MessageNotice>,
}

impl FanoutQueue {
    pub fn new(capacity: usize) -> (Self, FanoutWorkers) {
        let (broadcast_tx, broadcast_rx) = mpsc::channel(capacity.max(1));
        let (notice_tx, notice_rx) = mpsc::channel(capacity.max(1));

        (
            Self { broadcasts: broadcast_tx, notices: notice_tx },
            FanoutWorkers { broadcasts: broadcast_rx, notices: notice_rx },
        )
    }

    pub fn publish(&self, job: BroadcastJob) {
        let conversation_id = job.conversation_id;
        match self.broadcasts.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Broadcast queue full, dropping event for {}", conversation_id);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("Broadcast worker stopped, dropping event for {}", conversation_id);
            }
        }
    }

    pub fn notify(&self, notice: MessageNotice) {
        let message_id = notice.message.id;
        match self.notices.try_send(notice) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Notification queue full, dropping message {}", message_id);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("Notification worker stopped, dropping message {}", message_id);
            }
        }
    }
}

impl FanoutWorkers {
    /// Spawns both workers on the current actix runtime.
    pub fn spawn<B, N>(self, broadcaster: Arc<B>, notifier: Arc<N>)
    where
        B: Broadcaster + Send + Sync + 'static,
        N: MessageNotifier + Send + Sync + 'static,
    {
        actix_web::rt::spawn(run_broadcasts(self.broadcasts, broadcaster));
        actix_web::rt::spawn(run_notifications(self.notices, notifier));
    }

    #[cfg(test)]
    pub fn into_broadcasts(self) -> mpsc::Receiver<BroadcastJob> {
        self.broadcasts
    }
}

pub async fn run_broadcasts<B>(mut jobs: mpsc::Receiver<BroadcastJob>, broadcaster: Arc<B>)
where
    B: Broadcaster + Send + Sync + ?Sized,
{
    tracing::info!("Broadcast worker started");

    while let Some(job) = jobs.recv().await {
        let conversation_id = job.conversation_id;
        if let Err(e) = broadcaster.publish(job.conversation_id, job.event, job.skip_user_id) {
            tracing::warn!("Broadcast to {} failed: {}", conversation_id, e);
        }
    }

    tracing::info!("Broadcast worker stopped");
}

pub async fn run_notifications<N>(mut notices: mpsc::Receiver<MessageNotice>, notifier: Arc<N>)
where
    N: MessageNotifier + Send + Sync + ?Sized,
{
    tracing::info!("Notification worker started");

    while let Some(notice) = notices.recv().await {
        if let Err(e) = notifier.notify_new_message(&notice.message, &notice.recipients).await {
            tracing::warn!("Notification fan-out for message {} failed: {}", notice.message.id, e);
        }
    }

    tracing::info!("Notification worker stopped");
}
