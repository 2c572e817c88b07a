/// Message Service
///
/// Accepts a message, stores it with one SENT receipt per other participant,
/// then hands the broadcast and notification side effects to the fan-out queue.
///
/// Flow of `send_message`:
/// 1. Validate the payload
/// 2. Check the conversation exists and the sender belongs to it
/// 3. Store message + receipts in one transaction
/// 4. Enqueue a SEND event and a notification job (never fails the send)
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::api::error;
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::modules::conversation::repository::{ConversationRepository, ParticipantRepository};
use crate::modules::conversation::service::require_participant;
use crate::modules::fanout::{BroadcastJob, FanoutQueue, MessageNotice};
use crate::modules::message::model::{GetMessageResponse, SendMessageRequest};
use crate::modules::message::repository::MessageRepository;
use crate::modules::message::schema::MessageView;
use crate::modules::websocket::message::ChatEvent;

#[derive(Clone)]
pub struct MessageService<M, C, P>
where
    M: MessageRepository + Send + Sync,
    C: ConversationRepository + Send + Sync,
    P: ParticipantRepository + Send + Sync,
{
    message_repo: Arc<M>,
    conversation_repo: Arc<C>,
    participant_repo: Arc<P>,
    fanout: FanoutQueue,
}

impl<M, C, P> MessageService<M, C, P>
where
    M: MessageRepository + Send + Sync,
    C: ConversationRepository + Send + Sync,
    P: ParticipantRepository + Send + Sync,
{
    pub fn with_dependencies(
        message_repo: Arc<M>,
        conversation_repo: Arc<C>,
        participant_repo: Arc<P>,
        fanout: FanoutQueue,
    ) -> Self {
        MessageService { message_repo, conversation_repo, participant_repo, fanout }
    }

    pub async fn send_message(
        &self,
        sender_id: Uuid,
        request: SendMessageRequest,
    ) -> Result<MessageView, error::SystemError> {
        request.validate()?;

        let conversation_id = request.conversation_id;
        require_participant(
            self.conversation_repo.as_ref(),
            self.participant_repo.as_ref(),
            &conversation_id,
            &sender_id,
        )
        .await?;

        let recipients: Vec<Uuid> = self
            .participant_repo
            .list_participant_ids(&conversation_id)
            .await?
            .into_iter()
            .filter(|id| *id != sender_id)
            .collect();

        let insert = request.into_insert(Some(sender_id));
        let message = self.message_repo.create_with_receipts(&insert, &recipients).await?;

        tracing::info!(
            "Message {} stored in conversation {} for {} recipients",
            message.id,
            conversation_id,
            recipients.len()
        );

        self.fanout.publish(BroadcastJob {
            conversation_id,
            event: ChatEvent::Send(message.clone()),
            skip_user_id: None,
        });
        self.fanout.notify(MessageNotice { message: message.clone(), recipients });

        Ok(message)
    }

    /// One page of a conversation, newest first. `page` is zero-based.
    pub async fn list_messages(
        &self,
        viewer_id: Uuid,
        conversation_id: Uuid,
        page: Option<i64>,
        size: Option<i64>,
    ) -> Result<GetMessageResponse, error::SystemError> {
        let page = page.unwrap_or(0);
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page < 0 {
            return Err(error::SystemError::bad_request("Page must not be negative"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(error::SystemError::bad_request("Size must be between 1 and 100"));
        }
        let offset = page
            .checked_mul(size)
            .ok_or_else(|| error::SystemError::bad_request("Page is out of range"))?;

        require_participant(
            self.conversation_repo.as_ref(),
            self.participant_repo.as_ref(),
            &conversation_id,
            &viewer_id,
        )
        .await?;

        let mut messages =
            self.message_repo.find_page(&conversation_id, size + 1, offset).await?;

        let has_more = messages.len() as i64 > size;
        messages.truncate(size as usize);

        Ok(GetMessageResponse { messages, page, size, has_more })
    }
}
