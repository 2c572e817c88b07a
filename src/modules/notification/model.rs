use serde::Serialize;
use uuid::Uuid;

use crate::modules::notification::schema::NotificationType;

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub content: String,
    pub related_entity_id: Option<Uuid>,
    pub related_entity_type: Option<String>,
}

/// One alert for one device, in the Expo push API format.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpoPushMessage<'a> {
    pub to: &'a str,
    pub sound: &'static str,
    pub title: &'a str,
    pub body: &'a str,
    pub data: &'a serde_json::Value,
    pub priority: &'static str,
    pub channel_id: &'static str,
}

/// What the gateway pushes to every active device of a user.
#[derive(Debug, Clone, PartialEq)]
pub struct PushAlert {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}
