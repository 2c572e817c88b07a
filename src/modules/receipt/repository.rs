use uuid::Uuid;

use crate::{
    api::error,
    modules::receipt::schema::{ReceiptEntity, ReceiptStatus, UnreadCount},
};

#[async_trait::async_trait]
pub trait ReceiptRepository {
    async fn find(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ReceiptEntity>, error::SystemError>;

    /// Moves the receipt to `target` if it is currently earlier.
    ///
    /// Returns the updated receipt, or `None` when nothing changed (no receipt,
    /// or already at `target` or beyond).
    async fn advance(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
        target: ReceiptStatus,
    ) -> Result<Option<ReceiptEntity>, error::SystemError>;

    /// Ensures a READ receipt for every message in the conversation not sent by
    /// `user_id`. Returns how many receipts were created or upgraded.
    async fn mark_conversation_read(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<u64, error::SystemError>;

    async fn find_by_message(
        &self,
        message_id: &Uuid,
    ) -> Result<Vec<ReceiptEntity>, error::SystemError>;

    async fn count_unread_by_conversation(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<UnreadCount>, error::SystemError>;
}
