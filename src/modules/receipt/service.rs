use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::repository::{ConversationRepository, ParticipantRepository};
use crate::modules::conversation::service::require_participant;
use crate::modules::fanout::{BroadcastJob, FanoutQueue};
use crate::modules::message::repository::MessageRepository;
use crate::modules::receipt::model::{ReceiptChange, UnreadCountResponse};
use crate::modules::receipt::repository::ReceiptRepository;
use crate::modules::receipt::schema::{ReceiptEntity, ReceiptStatus};
use crate::modules::websocket::message::ChatEvent;

/// Tracks per-recipient delivery state: SENT -> DELIVERED -> READ.
///
/// Transitions never move backwards. Repeating a transition, or applying an
/// earlier one, changes nothing and raises no error.
#[derive(Clone)]
pub struct ReceiptService<R, M, C, P>
where
    R: ReceiptRepository + Send + Sync,
    M: MessageRepository + Send + Sync,
    C: ConversationRepository + Send + Sync,
    P: ParticipantRepository + Send + Sync,
{
    receipt_repo: Arc<R>,
    message_repo: Arc<M>,
    conversation_repo: Arc<C>,
    participant_repo: Arc<P>,
    fanout: FanoutQueue,
}

impl<R, M, C, P> ReceiptService<R, M, C, P>
where
    R: ReceiptRepository + Send + Sync,
    M: MessageRepository + Send + Sync,
    C: ConversationRepository + Send + Sync,
    P: ParticipantRepository + Send + Sync,
{
    pub fn with_dependencies(
        receipt_repo: Arc<R>,
        message_repo: Arc<M>,
        conversation_repo: Arc<C>,
        participant_repo: Arc<P>,
        fanout: FanoutQueue,
    ) -> Self {
        ReceiptService { receipt_repo, message_repo, conversation_repo, participant_repo, fanout }
    }

    pub async fn mark_delivered(
        &self,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<ReceiptChange, error::SystemError> {
        self.advance(message_id, user_id, ReceiptStatus::Delivered).await
    }

    pub async fn mark_read(
        &self,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<ReceiptChange, error::SystemError> {
        self.advance(message_id, user_id, ReceiptStatus::Read).await
    }

    async fn advance(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        target: ReceiptStatus,
    ) -> Result<ReceiptChange, error::SystemError> {
        let Some(current) = self.receipt_repo.find(&message_id, &user_id).await? else {
            return Ok(ReceiptChange { message_id, status: None, changed: false });
        };

        if !current.status.can_advance_to(target) {
            return Ok(ReceiptChange { message_id, status: Some(current.status), changed: false });
        }

        // the conditional update still decides when two marks race
        match self.receipt_repo.advance(&message_id, &user_id, target).await? {
            Some(receipt) => {
                tracing::debug!("Receipt {}/{} moved to {:?}", message_id, user_id, target);
                self.publish_transition(&receipt);
                Ok(ReceiptChange { message_id, status: Some(receipt.status), changed: true })
            }
            None => {
                let current = self.receipt_repo.find(&message_id, &user_id).await?;
                Ok(ReceiptChange { message_id, status: current.map(|r| r.status), changed: false })
            }
        }
    }

    fn publish_transition(&self, receipt: &ReceiptEntity) {
        let event = match receipt.status {
            ReceiptStatus::Delivered => ChatEvent::Delivered {
                conversation_id: receipt.conversation_id,
                message_id: receipt.message_id,
                user_id: receipt.user_id,
                delivered_at: receipt.updated_at,
            },
            ReceiptStatus::Read => ChatEvent::Read {
                conversation_id: receipt.conversation_id,
                message_id: receipt.message_id,
                user_id: receipt.user_id,
                read_at: receipt.updated_at,
            },
            ReceiptStatus::Sent => return,
        };

        self.fanout.publish(BroadcastJob {
            conversation_id: receipt.conversation_id,
            event,
            skip_user_id: None,
        });
    }

    /// Marks every message in the conversation not sent by `user_id` as READ.
    /// Returns how many receipts changed; a repeat run returns 0.
    pub async fn mark_conversation_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, error::SystemError> {
        require_participant(
            self.conversation_repo.as_ref(),
            self.participant_repo.as_ref(),
            &conversation_id,
            &user_id,
        )
        .await?;

        let updated = self.receipt_repo.mark_conversation_read(&conversation_id, &user_id).await?;

        tracing::debug!(
            "User {} read conversation {} ({} receipts updated)",
            user_id,
            conversation_id,
            updated
        );

        Ok(updated)
    }

    pub async fn list_receipts(
        &self,
        viewer_id: Uuid,
        message_id: Uuid,
    ) -> Result<Vec<ReceiptEntity>, error::SystemError> {
        let message = self
            .message_repo
            .find_by_id(&message_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        require_participant(
            self.conversation_repo.as_ref(),
            self.participant_repo.as_ref(),
            &message.conversation_id,
            &viewer_id,
        )
        .await?;

        self.receipt_repo.find_by_message(&message_id).await
    }

    pub async fn unread_counts(
        &self,
        user_id: Uuid,
    ) -> Result<UnreadCountResponse, error::SystemError> {
        let counts = self.receipt_repo.count_unread_by_conversation(&user_id).await?;
        Ok(counts.into())
    }
}
