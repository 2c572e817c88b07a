use uuid::Uuid;

use crate::{
    api::error,
    modules::message::{
        model::InsertMessage,
        schema::{MessageEntity, MessageView},
    },
};

#[async_trait::async_trait]
pub trait MessageRepository {
    /// Persists the message and a SENT receipt for every recipient atomically,
    /// and bumps the conversation's `updated_at`.
    async fn create_with_receipts(
        &self,
        message: &InsertMessage,
        recipients: &[Uuid],
    ) -> Result<MessageView, error::SystemError>;

    /// Newest first; ties on `sent_at` are broken by id.
    async fn find_page(
        &self,
        conversation_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageView>, error::SystemError>;

    /// The newest message of each given conversation; conversations without
    /// messages are left out.
    async fn find_latest_in(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<Vec<MessageView>, error::SystemError>;

    async fn find_by_id(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError>;
}
