/// WebSocket Message Protocol
///
/// Frames exchanged with clients are JSON objects tagged by `type`. Real-time
/// conversation events travel inside an `event` frame as a [`ChatEvent`], which
/// is itself tagged by `action`.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::message::{model::SendMessageRequest, schema::MessageView};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Authenticate the connection with a JWT access token
    #[serde(rename_all = "camelCase")]
    Auth { token: String },

    /// Persist and broadcast a message, same payload as `POST /api/messages`
    SendMessage(SendMessageRequest),

    /// Subscribe to a conversation's events
    #[serde(rename_all = "camelCase")]
    JoinConversation { conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    LeaveConversation { conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    TypingStart { conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    TypingStop { conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    MarkDelivered { message_id: Uuid },

    #[serde(rename_all = "camelCase")]
    MarkRead { message_id: Uuid },

    #[serde(rename_all = "camelCase")]
    MarkConversationRead { conversation_id: Uuid },

    /// Keep-alive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    AuthSuccess { user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    AuthFailed { reason: String },

    #[serde(rename_all = "camelCase")]
    Subscribed { conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    Unsubscribed { conversation_id: Uuid },

    /// Acknowledges a `sendMessage` with the persisted message
    MessageSent { message: MessageView },

    /// A conversation event delivered to room subscribers
    Event { event: ChatEvent },

    #[serde(rename_all = "camelCase")]
    ConversationRead { conversation_id: Uuid, updated: u64 },

    Pong,

    Error { message: String },
}

/// Real-time conversation event, discriminated by `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum ChatEvent {
    Send(MessageView),

    #[serde(rename_all = "camelCase")]
    Typing { conversation_id: Uuid, user_id: Uuid, is_typing: bool },

    #[serde(rename_all = "camelCase")]
    Read {
        conversation_id: Uuid,
        message_id: Uuid,
        user_id: Uuid,
        read_at: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename_all = "camelCase")]
    Delivered {
        conversation_id: Uuid,
        message_id: Uuid,
        user_id: Uuid,
        delivered_at: chrono::DateTime<chrono::Utc>,
    },
}

impl ChatEvent {
    pub fn conversation_id(&self) -> Uuid {
        match self {
            ChatEvent::Send(message) => message.conversation_id,
            ChatEvent::Typing { conversation_id, .. }
            | ChatEvent::Read { conversation_id, .. }
            | ChatEvent::Delivered { conversation_id, .. } => *conversation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::message::schema::MessageType;
    use crate::test::sample_view;

    // === ClientMessage ===

    #[test]
    fn test_client_auth_deserialize() {
        let json = r#"{"type":"auth","token":"my-jwt-token"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Auth { token } if token == "my-jwt-token"));
    }

    #[test]
    fn test_client_send_message_deserialize() {
        let id = Uuid::now_v7();
        let json = format!(
            r#"{{"type":"sendMessage","conversationId":"{}","content":"hello","messageType":"TEXT"}}"#,
            id
        );
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        match msg {
            ClientMessage::SendMessage(req) => {
                assert_eq!(req.conversation_id, id);
                assert_eq!(req.content.as_deref(), Some("hello"));
                assert_eq!(req.message_type, MessageType::Text);
            }
            _ => panic!("Expected SendMessage variant"),
        }
    }

    #[test]
    fn test_client_send_attachment_defaults_type() {
        let id = Uuid::now_v7();
        let json = format!(
            r#"{{"type":"sendMessage","conversationId":"{}","fileUrl":"https://x/y.pdf"}}"#,
            id
        );
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::SendMessage(req) if req.message_type == MessageType::Text && req.content.is_none()
        ));
    }

    #[test]
    fn test_client_join_conversation_deserialize() {
        let id = Uuid::now_v7();
        let json = format!(r#"{{"type":"joinConversation","conversationId":"{}"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(
            matches!(msg, ClientMessage::JoinConversation { conversation_id } if conversation_id == id)
        );
    }

    #[test]
    fn test_client_typing_stop_deserialize() {
        let id = Uuid::now_v7();
        let json = format!(r#"{{"type":"typingStop","conversationId":"{}"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(
            matches!(msg, ClientMessage::TypingStop { conversation_id } if conversation_id == id)
        );
    }

    #[test]
    fn test_client_receipt_frames_deserialize() {
        let id = Uuid::now_v7();

        let json = format!(r#"{{"type":"markDelivered","messageId":"{}"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(msg, ClientMessage::MarkDelivered { message_id } if message_id == id));

        let json = format!(r#"{{"type":"markRead","messageId":"{}"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(msg, ClientMessage::MarkRead { message_id } if message_id == id));

        let json = format!(r#"{{"type":"markConversationRead","conversationId":"{}"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::MarkConversationRead { conversation_id } if conversation_id == id
        ));
    }

    #[test]
    fn test_client_ping_deserialize() {
        let json = r#"{"type":"ping"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_invalid_type_returns_error() {
        let json = r#"{"type":"unknownType"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_missing_required_field_returns_error() {
        let json = r#"{"type":"markRead"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    // === ServerMessage ===

    #[test]
    fn test_server_auth_success_serialize() {
        let uid = Uuid::now_v7();
        let json = serde_json::to_string(&ServerMessage::AuthSuccess { user_id: uid }).unwrap();
        assert!(json.contains("\"type\":\"authSuccess\""));
        assert!(json.contains(&uid.to_string()));
    }

    #[test]
    fn test_server_pong_serialize() {
        let json = serde_json::to_string(&ServerMessage::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }

    #[test]
    fn test_server_error_serialize() {
        let msg = ServerMessage::Error { message: "Invalid frame".to_string() };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"error","message":"Invalid frame"}"#);
    }

    // === ChatEvent ===

    #[test]
    fn test_send_event_carries_full_message() {
        let conv = Uuid::now_v7();
        let view = sample_view(conv);
        let msg = ServerMessage::Event { event: ChatEvent::Send(view.clone()) };

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "event");
        assert_eq!(value["event"]["action"], "SEND");
        assert_eq!(value["event"]["conversationId"], conv.to_string());
        assert_eq!(value["event"]["senderName"], view.sender_name);
        assert_eq!(value["event"]["messageType"], "TEXT");
        assert!(value["event"].get("fileUrl").is_none());
    }

    #[test]
    fn test_typing_event_serialize() {
        let conv = Uuid::now_v7();
        let uid = Uuid::now_v7();
        let event = ChatEvent::Typing { conversation_id: conv, user_id: uid, is_typing: true };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["action"], "TYPING");
        assert_eq!(value["userId"], uid.to_string());
        assert_eq!(value["isTyping"], true);
        assert_eq!(event.conversation_id(), conv);
    }

    #[test]
    fn test_chat_event_roundtrip() {
        let original = ChatEvent::Read {
            conversation_id: Uuid::now_v7(),
            message_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            read_at: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("\"action\":\"READ\""));

        let parsed: ChatEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);

        let send = ChatEvent::Send(sample_view(Uuid::now_v7()));
        let parsed: ChatEvent = serde_json::from_str(&serde_json::to_string(&send).unwrap()).unwrap();
        assert_eq!(parsed, send);
    }
}
