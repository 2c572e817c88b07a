/// WebSocket Session Actor
///
/// Each connection gets one session actor. It holds the authenticated user and
/// the rooms it joined, and writes frames to the client through the channel
/// bridged by `handler.rs`.
///
/// Service calls run with `ctx.spawn()` + `into_actor()`; their results come back
/// to the actor through `.map()` so session state is only touched on the actor.
/// Sends use `ctx.wait()` instead, so one session's messages commit and fan out
/// in the order the client sent them.
use actix::prelude::*;
use actix_web::web;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::handle::ConversationSvc;
use crate::modules::message::handle::MessageSvc;
use crate::modules::message::model::SendMessageRequest;
use crate::modules::message::schema::MessageView;
use crate::modules::receipt::handle::ReceiptSvc;
use crate::utils::Claims;
use crate::ENV;

use super::events::*;
use super::message::{ChatEvent, ClientMessage, ServerMessage};
use super::server::WebSocketServer;

/// Services a session calls on behalf of its user.
#[derive(Clone)]
pub struct SessionServices {
    pub conversations: web::Data<ConversationSvc>,
    pub messages: web::Data<MessageSvc>,
    pub receipts: web::Data<ReceiptSvc>,
}

/// What a session needs from the services.
#[async_trait::async_trait]
pub trait SessionBackend: Send + Sync {
    async fn send_message(
        &self,
        sender_id: Uuid,
        request: SendMessageRequest,
    ) -> Result<MessageView, error::SystemError>;

    async fn join(&self, conversation_id: Uuid, user_id: Uuid) -> Result<(), error::SystemError>;

    async fn mark(&self, message_id: Uuid, user_id: Uuid, read: bool)
        -> Result<(), error::SystemError>;

    async fn mark_conversation_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, error::SystemError>;
}

#[async_trait::async_trait]
impl SessionBackend for SessionServices {
    async fn send_message(
        &self,
        sender_id: Uuid,
        request: SendMessageRequest,
    ) -> Result<MessageView, error::SystemError> {
        self.messages.send_message(sender_id, request).await
    }

    async fn join(&self, conversation_id: Uuid, user_id: Uuid) -> Result<(), error::SystemError> {
        self.conversations.ensure_participant(conversation_id, user_id).await?;
        Ok(())
    }

    async fn mark(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        read: bool,
    ) -> Result<(), error::SystemError> {
        if read {
            self.receipts.mark_read(message_id, user_id).await?;
        } else {
            self.receipts.mark_delivered(message_id, user_id).await?;
        }
        Ok(())
    }

    async fn mark_conversation_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, error::SystemError> {
        self.receipts.mark_conversation_read(conversation_id, user_id).await
    }
}

pub struct WebSocketSession {
    pub id: Uuid,

    /// Set by a successful `auth` frame
    pub user_id: Option<Uuid>,

    /// Conversations this session subscribed to
    pub joined: HashSet<Uuid>,

    pub server: Addr<WebSocketServer>,

    /// Outbound JSON frames (bridge -> handler.rs -> WebSocket)
    pub tx: mpsc::UnboundedSender<String>,

    pub services: Arc<dyn SessionBackend>,
}

impl WebSocketSession {
    pub fn new(
        server: Addr<WebSocketServer>,
        tx: mpsc::UnboundedSender<String>,
        services: Arc<dyn SessionBackend>,
    ) -> Self {
        Self { id: Uuid::now_v7(), user_id: None, joined: HashSet::new(), server, tx, services }
    }

    fn send_to_client(&self, msg: &ServerMessage) {
        match serde_json::to_string(msg) {
            Ok(json) => {
                if let Err(e) = self.tx.send(json) {
                    tracing::error!("Failed to queue frame for session {}: {}", self.id, e);
                }
            }
            Err(e) => {
                tracing::error!("Failed to serialize frame for session {}: {}", self.id, e);
            }
        }
    }

    fn send_error(&self, message: impl Into<String>) {
        self.send_to_client(&ServerMessage::Error { message: message.into() });
    }

    /// Reports a failed service call with the same wording as the HTTP API.
    fn send_failure(&self, err: error::SystemError) {
        self.send_error(error::Error::from(err).client_message());
    }

    fn require_auth(&self) -> Option<Uuid> {
        if self.user_id.is_none() {
            self.send_error("Authenticate before sending this frame");
            tracing::warn!("Session {} is not authenticated, request rejected", self.id);
        }
        self.user_id
    }

    fn handle_client_message(&mut self, msg: ClientMessage, ctx: &mut Context<Self>) {
        match msg {
            ClientMessage::Auth { token } => self.handle_auth(&token),
            ClientMessage::SendMessage(request) => self.handle_send_message(request, ctx),
            ClientMessage::JoinConversation { conversation_id } => {
                self.handle_join_conversation(conversation_id, ctx)
            }
            ClientMessage::LeaveConversation { conversation_id } => {
                self.handle_leave_conversation(conversation_id)
            }
            ClientMessage::TypingStart { conversation_id } => {
                self.handle_typing(conversation_id, true)
            }
            ClientMessage::TypingStop { conversation_id } => {
                self.handle_typing(conversation_id, false)
            }
            ClientMessage::MarkDelivered { message_id } => {
                self.handle_mark(message_id, false, ctx)
            }
            ClientMessage::MarkRead { message_id } => self.handle_mark(message_id, true, ctx),
            ClientMessage::MarkConversationRead { conversation_id } => {
                self.handle_mark_conversation_read(conversation_id, ctx)
            }
            ClientMessage::Ping => self.send_to_client(&ServerMessage::Pong),
        }
    }

    fn handle_auth(&mut self, token: &str) {
        if self.user_id.is_some() {
            self.send_error("Session already authenticated");
            return;
        }

        let claims = match Claims::decode(token, ENV.jwt_secret.as_ref()) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("JWT verification failed (session {}): {}", self.id, e);
                self.send_to_client(&ServerMessage::AuthFailed {
                    reason: "Token invalid or expired".to_string(),
                });
                return;
            }
        };

        if !claims.is_access_token() {
            self.send_to_client(&ServerMessage::AuthFailed {
                reason: "Access token required".to_string(),
            });
            return;
        }

        let user_id = claims.sub;
        self.user_id = Some(user_id);
        self.server.do_send(Authenticate { session_id: self.id, user_id });
        self.send_to_client(&ServerMessage::AuthSuccess { user_id });

        tracing::info!("User {} authenticated on session {}", user_id, self.id);
    }

    fn handle_send_message(&self, request: SendMessageRequest, ctx: &mut Context<Self>) {
        let Some(user_id) = self.require_auth() else {
            return;
        };

        let service = self.services.clone();

        ctx.wait(
            async move { service.send_message(user_id, request).await }.into_actor(self).map(
                |result, act, _ctx| match result {
                    Ok(message) => act.send_to_client(&ServerMessage::MessageSent { message }),
                    Err(e) => {
                        tracing::warn!("Send from session {} failed: {}", act.id, e);
                        act.send_failure(e);
                    }
                },
            ),
        );
    }

    /// Membership is checked once here; later events for the room are not re-checked.
    fn handle_join_conversation(&self, conversation_id: Uuid, ctx: &mut Context<Self>) {
        let Some(user_id) = self.require_auth() else {
            return;
        };

        let service = self.services.clone();

        ctx.spawn(
            async move { service.join(conversation_id, user_id).await }
                .into_actor(self)
                .map(move |result, act, _ctx| match result {
                    Ok(_) => {
                        act.joined.insert(conversation_id);
                        act.server.do_send(JoinRoom { session_id: act.id, conversation_id });
                        act.send_to_client(&ServerMessage::Subscribed { conversation_id });
                    }
                    Err(e) => act.send_failure(e),
                }),
        );
    }

    fn handle_leave_conversation(&mut self, conversation_id: Uuid) {
        if self.require_auth().is_none() {
            return;
        }

        if self.joined.remove(&conversation_id) {
            self.server.do_send(LeaveRoom { session_id: self.id, conversation_id });
        }
        self.send_to_client(&ServerMessage::Unsubscribed { conversation_id });
    }

    fn handle_typing(&self, conversation_id: Uuid, is_typing: bool) {
        let Some(user_id) = self.require_auth() else {
            return;
        };

        if !self.joined.contains(&conversation_id) {
            self.send_error("Join the conversation before sending typing events");
            return;
        }

        self.server.do_send(BroadcastToRoom {
            conversation_id,
            event: ChatEvent::Typing { conversation_id, user_id, is_typing },
            skip_user_id: Some(user_id),
        });
    }

    fn handle_mark(&self, message_id: Uuid, read: bool, ctx: &mut Context<Self>) {
        let Some(user_id) = self.require_auth() else {
            return;
        };

        let service = self.services.clone();

        ctx.spawn(
            async move { service.mark(message_id, user_id, read).await }
                .into_actor(self)
                .map(|result, act, _ctx| {
                    if let Err(e) = result {
                        act.send_failure(e);
                    }
                }),
        );
    }

    fn handle_mark_conversation_read(&self, conversation_id: Uuid, ctx: &mut Context<Self>) {
        let Some(user_id) = self.require_auth() else {
            return;
        };

        let service = self.services.clone();

        ctx.spawn(
            async move { service.mark_conversation_read(conversation_id, user_id).await }
                .into_actor(self)
                .map(move |result, act, _ctx| match result {
                    Ok(updated) => act.send_to_client(&ServerMessage::ConversationRead {
                        conversation_id,
                        updated,
                    }),
                    Err(e) => act.send_failure(e),
                }),
        );
    }
}

impl Actor for WebSocketSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::debug!("WebSocket session started: {}", self.id);
        self.server.do_send(Connect { id: self.id, addr: ctx.address().recipient() });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("WebSocket session stopped: {}", self.id);
        self.server.do_send(Disconnect { id: self.id });
    }
}

impl Message for ClientMessage {
    type Result = ();
}

impl Handler<ClientMessage> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, msg: ClientMessage, ctx: &mut Context<Self>) {
        self.handle_client_message(msg, ctx);
    }
}

/// Frames from the server actor are forwarded to the client as-is.
impl Handler<ServerMessage> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, _ctx: &mut Context<Self>) {
        self.send_to_client(&msg);
    }
}

impl Handler<CloseSession> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, _: CloseSession, ctx: &mut Context<Self>) {
        ctx.stop();
    }
}
