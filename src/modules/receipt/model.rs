use serde::Serialize;
use uuid::Uuid;

use crate::modules::receipt::schema::{ReceiptStatus, UnreadCount};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptChange {
    pub message_id: Uuid,
    /// Current status; `None` when the caller has no receipt for the message
    pub status: Option<ReceiptStatus>,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub total: i64,
    pub conversations: Vec<UnreadCount>,
}

impl From<Vec<UnreadCount>> for UnreadCountResponse {
    fn from(conversations: Vec<UnreadCount>) -> Self {
        let total = conversations.iter().map(|c| c.unread).sum();
        Self { total, conversations }
    }
}
