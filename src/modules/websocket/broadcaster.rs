use actix::prelude::{Addr, SendError};
use uuid::Uuid;

use super::{events::BroadcastToRoom, message::ChatEvent, server::WebSocketServer};
use crate::api::error;

/// Publishes conversation events to live subscribers.
pub trait Broadcaster {
    fn publish(
        &self,
        conversation_id: Uuid,
        event: ChatEvent,
        skip_user_id: Option<Uuid>,
    ) -> Result<(), error::SystemError>;
}

impl Broadcaster for Addr<WebSocketServer> {
    fn publish(
        &self,
        conversation_id: Uuid,
        event: ChatEvent,
        skip_user_id: Option<Uuid>,
    ) -> Result<(), error::SystemError> {
        self.try_send(BroadcastToRoom { conversation_id, event, skip_user_id }).map_err(|e| match e {
            SendError::Full(_) => error::SystemError::transient("WebSocket server mailbox is full"),
            SendError::Closed(_) => error::SystemError::transient("WebSocket server has stopped"),
        })
    }
}
