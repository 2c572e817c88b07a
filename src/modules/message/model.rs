use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::modules::message::schema::{MessageType, MessageView};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_has_body"))]
pub struct SendMessageRequest {
    pub conversation_id: Uuid,
    #[validate(length(max = 5000, message = "Content must be at most 5000 characters"))]
    pub content: Option<String>,
    #[serde(default)]
    pub message_type: MessageType,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    #[validate(range(min = 0, message = "File size must not be negative"))]
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub thumbnail_url: Option<String>,
}

fn validate_has_body(request: &SendMessageRequest) -> Result<(), ValidationError> {
    if request.text().is_some() || request.has_attachment() {
        return Ok(());
    }

    Err(ValidationError::new("empty_message")
        .with_message("Message must have content or an attachment".into()))
}

impl SendMessageRequest {
    /// Content unless it is blank.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn has_attachment(&self) -> bool {
        self.file_url.is_some()
            || self.file_name.is_some()
            || self.file_size.is_some()
            || self.file_type.is_some()
            || self.thumbnail_url.is_some()
    }

    pub fn into_insert(self, sender_id: Option<Uuid>) -> InsertMessage {
        let content = self.text().map(str::to_string);

        InsertMessage {
            id: Uuid::now_v7(),
            conversation_id: self.conversation_id,
            sender_id,
            content,
            message_type: self.message_type,
            file_url: self.file_url,
            file_name: self.file_name,
            file_size: self.file_size,
            file_type: self.file_type,
            thumbnail_url: self.thumbnail_url,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InsertMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub content: Option<String>,
    pub message_type: MessageType,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMessageResponse {
    pub messages: Vec<MessageView>,
    pub page: i64,
    pub size: i64,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> SendMessageRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn message_type_defaults_to_text() {
        let req = request(serde_json::json!({
            "conversationId": Uuid::now_v7(),
            "content": "hi",
        }));
        assert_eq!(req.message_type, MessageType::Text);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        let result = serde_json::from_value::<SendMessageRequest>(serde_json::json!({
            "conversationId": Uuid::now_v7(),
            "content": "hi",
            "messageType": "STICKER",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn blank_content_without_attachment_is_invalid() {
        let req = request(serde_json::json!({
            "conversationId": Uuid::now_v7(),
            "content": "   \n",
        }));
        assert!(req.validate().is_err());

        let req = request(serde_json::json!({ "conversationId": Uuid::now_v7() }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn attachment_alone_is_enough() {
        let req = request(serde_json::json!({
            "conversationId": Uuid::now_v7(),
            "messageType": "IMAGE",
            "fileUrl": "https://cdn.example.com/a.png",
            "fileSize": 2048,
        }));
        assert!(req.validate().is_ok());

        let insert = req.into_insert(Some(Uuid::now_v7()));
        assert_eq!(insert.content, None);
        assert_eq!(insert.message_type, MessageType::Image);
    }

    #[test]
    fn negative_file_size_is_invalid() {
        let req = request(serde_json::json!({
            "conversationId": Uuid::now_v7(),
            "content": "hi",
            "fileSize": -1,
        }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn content_length_is_counted_in_characters() {
        let at_limit = "é".repeat(5000);
        let req = request(serde_json::json!({
            "conversationId": Uuid::now_v7(),
            "content": at_limit,
        }));
        assert!(req.validate().is_ok());

        let over = "a".repeat(5001);
        let req = request(serde_json::json!({
            "conversationId": Uuid::now_v7(),
            "content": over,
        }));
        assert!(req.validate().is_err());
    }
}
