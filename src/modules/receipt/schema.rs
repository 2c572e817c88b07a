use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

/// Delivery state of one message for one recipient.
///
/// Variants are declared in progression order, matching the `receipt_status`
/// Postgres enum, so `Ord` and SQL `<` agree on what "earlier" means.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "receipt_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiptStatus {
    Sent,
    Delivered,
    Read,
}

impl ReceiptStatus {
    /// Transitions only move forward; the same or an earlier status is a no-op.
    pub fn can_advance_to(self, next: ReceiptStatus) -> bool {
        next > self
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptEntity {
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: Uuid,
    pub status: ReceiptStatus,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub conversation_id: Uuid,
    pub unread: i64,
}
