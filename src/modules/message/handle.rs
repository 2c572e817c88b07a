use actix_web::{get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        conversation::{
            handle::ParticipantRepo, model::MessagePageQuery,
            repository_pg::ConversationPgRepository,
        },
        message::{
            model::{GetMessageResponse, SendMessageRequest},
            repository_pg::MessagePgRepository,
            schema::MessageView,
            service::MessageService,
        },
    },
    utils::{ValidatedJson, ValidatedQuery},
};

pub type MessageSvc = MessageService<MessagePgRepository, ConversationPgRepository, ParticipantRepo>;

#[post("")]
pub async fn send_message(
    message_svc: web::Data<MessageSvc>,
    body: ValidatedJson<SendMessageRequest>,
    req: HttpRequest,
) -> Result<success::Success<MessageView>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let message = message_svc.send_message(user_id, body.0).await?;

    Ok(success::Success::created(Some(message)).message("Message sent"))
}

#[get("/{conversation_id:[0-9a-fA-F-]{36}}/messages")]
pub async fn list_messages(
    message_svc: web::Data<MessageSvc>,
    conversation_id: web::Path<Uuid>,
    query: ValidatedQuery<MessagePageQuery>,
    req: HttpRequest,
) -> Result<success::Success<GetMessageResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let page = message_svc
        .list_messages(user_id, conversation_id.into_inner(), query.0.page, query.0.size)
        .await?;

    Ok(success::Success::ok(Some(page)).message("Successfully retrieved messages"))
}
