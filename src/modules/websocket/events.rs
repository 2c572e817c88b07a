/// WebSocket Actor Events
///
/// Messages exchanged between session actors, the server actor and the
/// broadcast worker.
use actix::prelude::*;
use uuid::Uuid;

use super::message::{ChatEvent, ServerMessage};

/// Event: a session connected
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub id: Uuid,
    /// Where the server delivers frames for this session
    pub addr: Recipient<ServerMessage>,
}

/// Event: a session disconnected; it leaves every room
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub id: Uuid,
}

/// Event: a session authenticated as `user_id`
#[derive(Message)]
#[rtype(result = "()")]
pub struct Authenticate {
    pub session_id: Uuid,
    pub user_id: Uuid,
}

/// Event: subscribe a session to a conversation room.
///
/// Membership has already been checked by the session.
#[derive(Message)]
#[rtype(result = "()")]
pub struct JoinRoom {
    pub session_id: Uuid,
    pub conversation_id: Uuid,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct LeaveRoom {
    pub session_id: Uuid,
    pub conversation_id: Uuid,
}

/// Event: deliver a conversation event to every subscribed session
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct BroadcastToRoom {
    pub conversation_id: Uuid,
    pub event: ChatEvent,
    /// Sessions of this user are skipped (e.g. the typist)
    pub skip_user_id: Option<Uuid>,
}

/// Event: the socket closed; stop the session actor
#[derive(Message)]
#[rtype(result = "()")]
pub struct CloseSession;
