/// WebSocket Module
///
/// Real-time delivery of conversation events:
///
/// - Message protocol (ClientMessage, ServerMessage, ChatEvent)
/// - WebSocket Server actor (sessions and conversation rooms)
/// - WebSocket Session actor (one per connection)
/// - Broadcaster (how the fan-out worker reaches the server actor)
/// - HTTP handler (upgrade HTTP to WebSocket)
pub mod broadcaster;
pub mod events;
pub mod handler;
pub mod message;
pub mod server;
pub mod session;
