use actix_web::{delete, get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::conversation::{
        cache::CachedParticipantRepository,
        model::{AddMemberRequest, ConversationDetail, ConversationSummary, NewConversation},
        repository_pg::{ConversationPgRepository, ParticipantPgRepository},
        schema::ParticipantEntity,
        service::ConversationService,
    },
    modules::message::repository_pg::MessagePgRepository,
    utils::ValidatedJson,
};

pub type ParticipantRepo = CachedParticipantRepository<ParticipantPgRepository>;
pub type ConversationSvc =
    ConversationService<ConversationPgRepository, ParticipantRepo, MessagePgRepository>;

#[get("")]
pub async fn list_conversations(
    conversation_svc: web::Data<ConversationSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ConversationSummary>>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let conversations = conversation_svc.list_for_user(user_id).await?;

    Ok(success::Success::ok(Some(conversations)).message("Successfully retrieved conversations"))
}

#[post("")]
pub async fn create_conversation(
    conversation_svc: web::Data<ConversationSvc>,
    body: ValidatedJson<NewConversation>,
    req: HttpRequest,
) -> Result<success::Success<ConversationDetail>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let conversation = conversation_svc.create_conversation(user_id, body.0).await?;

    Ok(success::Success::created(Some(conversation)).message("Successfully created conversation"))
}

#[get("/{conversation_id:[0-9a-fA-F-]{36}}")]
pub async fn get_conversation(
    conversation_svc: web::Data<ConversationSvc>,
    conversation_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ConversationDetail>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let conversation =
        conversation_svc.get_conversation(user_id, conversation_id.into_inner()).await?;

    Ok(success::Success::ok(Some(conversation)).message("Successfully retrieved conversation"))
}

#[post("/{conversation_id:[0-9a-fA-F-]{36}}/members")]
pub async fn add_member(
    conversation_svc: web::Data<ConversationSvc>,
    conversation_id: web::Path<Uuid>,
    body: ValidatedJson<AddMemberRequest>,
    req: HttpRequest,
) -> Result<success::Success<ParticipantEntity>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let participant =
        conversation_svc.add_member(user_id, conversation_id.into_inner(), body.0.user_id).await?;

    Ok(success::Success::created(Some(participant)).message("Member added"))
}

#[delete("/{conversation_id:[0-9a-fA-F-]{36}}/members/{user_id:[0-9a-fA-F-]{36}}")]
pub async fn remove_member(
    conversation_svc: web::Data<ConversationSvc>,
    path: web::Path<(Uuid, Uuid)>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let actor_id = get_claims(&req)?.sub;
    let (conversation_id, user_id) = path.into_inner();

    conversation_svc.remove_member(actor_id, conversation_id, user_id).await?;

    Ok(success::Success::no_content())
}
