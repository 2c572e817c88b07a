/// WebSocket HTTP Handler
///
/// Upgrades the request and bridges both directions:
/// - Inbound:  Client -> WebSocket -> parse ClientMessage -> Session Actor
/// - Outbound: Server Actor -> Session Actor -> mpsc channel -> WebSocket -> Client
use actix::{Actor, Addr};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_ws::Message;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::events::CloseSession;
use super::message::{ClientMessage, ServerMessage};
use super::server::WebSocketServer;
use super::session::{SessionServices, WebSocketSession};
use crate::modules::{
    conversation::handle::ConversationSvc, message::handle::MessageSvc,
    receipt::handle::ReceiptSvc,
};

/// Endpoint: GET /ws
pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<WebSocketServer>>,
    conversations: web::Data<ConversationSvc>,
    messages: web::Data<MessageSvc>,
    receipts: web::Data<ReceiptSvc>,
) -> Result<HttpResponse, Error> {
    tracing::debug!("WebSocket upgrade request from {:?}", req.peer_addr());

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let addr = WebSocketSession::new(
        server.get_ref().clone(),
        tx,
        Arc::new(SessionServices { conversations, messages, receipts }),
    )
    .start();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                // === INBOUND: Client -> Server ===
                msg = msg_stream.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ClientMessage>(&text) {
                                Ok(client_msg) => addr.do_send(client_msg),
                                Err(e) => {
                                    tracing::warn!(
                                        "Unparseable client frame: {} - raw: {}",
                                        e,
                                        text.chars().take(100).collect::<String>()
                                    );

                                    let reply = ServerMessage::Error {
                                        message: format!("Invalid frame: {e}"),
                                    };
                                    if let Ok(json) = serde_json::to_string(&reply) {
                                        if ws_session.text(json).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                            }
                        }

                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_session.pong(&data).await {
                                tracing::error!("Failed to send pong: {}", e);
                                break;
                            }
                        }

                        Some(Ok(Message::Pong(_))) => {}

                        Some(Ok(Message::Close(reason))) => {
                            tracing::info!("WebSocket close frame: {:?}", reason);
                            break;
                        }

                        Some(Ok(Message::Binary(_))) => {
                            tracing::warn!("Binary frames are not supported");
                        }

                        Some(Ok(Message::Continuation(_) | Message::Nop)) => {}

                        Some(Err(e)) => {
                            tracing::error!("WebSocket protocol error: {}", e);
                            break;
                        }

                        None => break,
                    }
                }

                // === OUTBOUND: Server -> Client ===
                Some(json) = rx.recv() => {
                    if ws_session.text(json).await.is_err() {
                        tracing::error!("Failed to write frame to WebSocket client");
                        break;
                    }
                }
            }
        }

        addr.do_send(CloseSession);
        let _ = ws_session.close(None).await;
        tracing::debug!("WebSocket message loop finished");
    });

    Ok(response)
}
