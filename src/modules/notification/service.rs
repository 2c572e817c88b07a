use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::error,
    constants::PUSH_PREVIEW_LENGTH,
    modules::{
        message::schema::{MessageType, MessageView},
        notification::{
            model::{NewNotification, PushAlert},
            push::PushGateway,
            repository::NotificationRepository,
            schema::NotificationType,
        },
    },
};

const NEW_MESSAGE_TITLE: &str = "New message";

/// Consumer of the notification queue.
#[async_trait::async_trait]
pub trait MessageNotifier {
    async fn notify_new_message(
        &self,
        message: &MessageView,
        recipients: &[Uuid],
    ) -> Result<(), error::SystemError>;
}

/// Short description of a message for notification text.
pub fn message_preview(message: &MessageView) -> String {
    match message.message_type {
        MessageType::Image => "sent an image".to_string(),
        MessageType::Video => "sent a video".to_string(),
        MessageType::File => "sent a file".to_string(),
        MessageType::Text | MessageType::System => message.content.clone().unwrap_or_default(),
    }
}

/// Cuts `text` after `max` characters and marks the cut with "...".
pub fn truncate_preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[derive(Clone)]
pub struct NotificationService<N, G>
where
    N: NotificationRepository + Send + Sync,
    G: PushGateway + Send + Sync,
{
    notification_repo: Arc<N>,
    push_gateway: Arc<G>,
}

impl<N, G> NotificationService<N, G>
where
    N: NotificationRepository + Send + Sync,
    G: PushGateway + Send + Sync,
{
    pub fn with_dependencies(notification_repo: Arc<N>, push_gateway: Arc<G>) -> Self {
        NotificationService { notification_repo, push_gateway }
    }

    async fn notify_recipient(
        &self,
        recipient: &Uuid,
        message: &MessageView,
        preview: &str,
    ) -> Result<(), error::SystemError> {
        self.notification_repo
            .create(&NewNotification {
                user_id: *recipient,
                notification_type: NotificationType::Message,
                title: NEW_MESSAGE_TITLE.to_string(),
                content: format!("{}: {}", message.sender_name, preview),
                related_entity_id: Some(message.id),
                related_entity_type: Some("MESSAGE".to_string()),
            })
            .await?;

        let alert = PushAlert {
            title: NEW_MESSAGE_TITLE.to_string(),
            body: format!(
                "{}: {}",
                message.sender_name,
                truncate_preview(preview, PUSH_PREVIEW_LENGTH)
            ),
            data: serde_json::json!({
                "type": "MESSAGE",
                "conversationId": message.conversation_id,
                "messageId": message.id,
                "senderName": message.sender_name,
            }),
        };
        self.push_gateway.push(recipient, &alert).await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl<N, G> MessageNotifier for NotificationService<N, G>
where
    N: NotificationRepository + Send + Sync,
    G: PushGateway + Send + Sync,
{
    async fn notify_new_message(
        &self,
        message: &MessageView,
        recipients: &[Uuid],
    ) -> Result<(), error::SystemError> {
        let preview = message_preview(message);
        let mut failed = 0usize;

        for recipient in recipients {
            if let Err(e) = self.notify_recipient(recipient, message, &preview).await {
                failed += 1;
                tracing::warn!(
                    "Notifying {} about message {} failed: {}",
                    recipient,
                    message.id,
                    e
                );
            }
        }

        if failed > 0 {
            return Err(error::SystemError::transient(format!(
                "{failed} of {} recipients were not notified",
                recipients.len()
            )));
        }

        Ok(())
    }
}
