/// WebSocket Server Actor
///
/// Owns every live session and the conversation rooms they subscribed to.
/// All state lives inside the actor, so room membership changes and broadcasts
/// are applied in mailbox order.
use actix::prelude::*;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::events::*;
use super::message::ServerMessage;
use crate::constants::DEFAULT_MAILBOX_CAPACITY;

pub struct WebSocketServer {
    /// session_id -> where to deliver frames
    sessions: HashMap<Uuid, Recipient<ServerMessage>>,

    /// session_id -> authenticated user
    session_users: HashMap<Uuid, Uuid>,

    /// conversation_id -> subscribed session_ids
    rooms: HashMap<Uuid, HashSet<Uuid>>,

    mailbox_capacity: usize,
}

impl WebSocketServer {
    pub fn new() -> Self {
        Self::with_mailbox_capacity(DEFAULT_MAILBOX_CAPACITY)
    }

    /// Broadcasts are enqueued with `try_send`, so the mailbox bounds how far
    /// the server may fall behind before events are dropped.
    pub fn with_mailbox_capacity(mailbox_capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            session_users: HashMap::new(),
            rooms: HashMap::new(),
            mailbox_capacity,
        }
    }

    fn leave_all_rooms(&mut self, session_id: &Uuid) {
        for sessions in self.rooms.values_mut() {
            sessions.remove(session_id);
        }
        self.rooms.retain(|_, sessions| !sessions.is_empty());
    }
}

impl Default for WebSocketServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for WebSocketServer {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.set_mailbox_capacity(self.mailbox_capacity);
        tracing::info!("WebSocket server started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("WebSocket server stopped");
    }
}

impl Handler<Connect> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        tracing::debug!("New WebSocket session connected: {}", msg.id);
        self.sessions.insert(msg.id, msg.addr);
    }
}

impl Handler<Disconnect> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        self.sessions.remove(&msg.id);
        let user_id = self.session_users.remove(&msg.id);
        self.leave_all_rooms(&msg.id);

        tracing::debug!("WebSocket session {} (user {:?}) disconnected", msg.id, user_id);
    }
}

impl Handler<Authenticate> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: Authenticate, _: &mut Context<Self>) {
        self.session_users.insert(msg.session_id, msg.user_id);
        tracing::info!("User {} authenticated on session {}", msg.user_id, msg.session_id);
    }
}

impl Handler<JoinRoom> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: JoinRoom, _: &mut Context<Self>) {
        if !self.sessions.contains_key(&msg.session_id) {
            tracing::debug!("Ignoring join from unknown session {}", msg.session_id);
            return;
        }

        let room = self.rooms.entry(msg.conversation_id).or_default();
        room.insert(msg.session_id);

        tracing::debug!(
            "Session {} joined conversation {} ({} sessions in room)",
            msg.session_id,
            msg.conversation_id,
            room.len()
        );
    }
}

impl Handler<LeaveRoom> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: LeaveRoom, _: &mut Context<Self>) {
        if let Some(room) = self.rooms.get_mut(&msg.conversation_id) {
            room.remove(&msg.session_id);

            if room.is_empty() {
                self.rooms.remove(&msg.conversation_id);
                tracing::debug!("Room {} empty, removed", msg.conversation_id);
            }
        }
    }
}

impl Handler<BroadcastToRoom> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: BroadcastToRoom, _: &mut Context<Self>) {
        let Some(room) = self.rooms.get(&msg.conversation_id) else {
            tracing::debug!("No subscribers for conversation {}", msg.conversation_id);
            return;
        };

        let mut sent_count = 0;

        for session_id in room {
            if let Some(skip) = msg.skip_user_id {
                if self.session_users.get(session_id) == Some(&skip) {
                    continue;
                }
            }

            if let Some(recipient) = self.sessions.get(session_id) {
                recipient.do_send(ServerMessage::Event { event: msg.event.clone() });
                sent_count += 1;
            }
        }

        tracing::debug!("Broadcast to room {}: sent to {} sessions", msg.conversation_id, sent_count);
    }
}

impl Message for ServerMessage {
    type Result = ();
}
