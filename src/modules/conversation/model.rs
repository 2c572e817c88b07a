use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::{
    conversation::schema::{
        ConversationEntity, ConversationType, ParticipantEntity, ParticipantRole,
    },
    message::schema::MessageView,
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewConversation {
    #[serde(rename = "type")]
    pub _type: ConversationType,
    #[validate(length(min = 1, max = 100, message = "Group name must be 1-100 characters"))]
    pub group_name: Option<String>,
    pub group_avatar_url: Option<String>,
    #[validate(length(min = 1, message = "At least one participant is required"))]
    pub participant_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct InsertConversation {
    pub _type: ConversationType,
    pub group_name: Option<String>,
    pub group_avatar_url: Option<String>,
    pub created_by: Uuid,
    /// Unique per pair of users; `None` for groups.
    pub private_pair: Option<String>,
    pub members: Vec<NewParticipant>,
}

/// Same key whichever of the two users creates the conversation.
pub fn private_pair_key(a: &Uuid, b: &Uuid) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{low}:{high}")
}

#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub user_id: Uuid,
    pub role: ParticipantRole,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: ConversationEntity,
    pub participants: Vec<ParticipantEntity>,
}

/// One row of the conversation list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: ConversationEntity,
    pub last_message: Option<MessageView>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MessagePageQuery {
    #[validate(range(min = 0, message = "Page must not be negative"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Size must be between 1 and 100"))]
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub conversation_id: Uuid,
    pub updated: u64,
}
