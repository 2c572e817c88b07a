use actix_web::{get, post, put, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        conversation::{
            handle::ParticipantRepo, model::MarkReadResponse,
            repository_pg::ConversationPgRepository,
        },
        message::repository_pg::MessagePgRepository,
        receipt::{
            model::{ReceiptChange, UnreadCountResponse},
            repository_pg::ReceiptPgRepository,
            schema::ReceiptEntity,
            service::ReceiptService,
        },
    },
};

pub type ReceiptSvc = ReceiptService<
    ReceiptPgRepository,
    MessagePgRepository,
    ConversationPgRepository,
    ParticipantRepo,
>;

#[put("/{message_id:[0-9a-fA-F-]{36}}/delivered")]
pub async fn mark_delivered(
    receipt_svc: web::Data<ReceiptSvc>,
    message_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ReceiptChange>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let change = receipt_svc.mark_delivered(message_id.into_inner(), user_id).await?;

    Ok(success::Success::ok(Some(change)).message("Marked as delivered"))
}

#[put("/{message_id:[0-9a-fA-F-]{36}}/read")]
pub async fn mark_read(
    receipt_svc: web::Data<ReceiptSvc>,
    message_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ReceiptChange>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let change = receipt_svc.mark_read(message_id.into_inner(), user_id).await?;

    Ok(success::Success::ok(Some(change)).message("Marked as read"))
}

#[get("/{message_id:[0-9a-fA-F-]{36}}/receipts")]
pub async fn list_receipts(
    receipt_svc: web::Data<ReceiptSvc>,
    message_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ReceiptEntity>>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let receipts = receipt_svc.list_receipts(user_id, message_id.into_inner()).await?;

    Ok(success::Success::ok(Some(receipts)).message("Successfully retrieved receipts"))
}

#[get("/unread-count")]
pub async fn unread_counts(
    receipt_svc: web::Data<ReceiptSvc>,
    req: HttpRequest,
) -> Result<success::Success<UnreadCountResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let counts = receipt_svc.unread_counts(user_id).await?;

    Ok(success::Success::ok(Some(counts)).message("Successfully retrieved unread counts"))
}

#[post("/{conversation_id:[0-9a-fA-F-]{36}}/read")]
pub async fn mark_conversation_read(
    receipt_svc: web::Data<ReceiptSvc>,
    conversation_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<MarkReadResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let conversation_id = conversation_id.into_inner();

    let updated = receipt_svc.mark_conversation_read(conversation_id, user_id).await?;

    Ok(success::Success::ok(Some(MarkReadResponse { conversation_id, updated }))
        .message("Conversation marked as read"))
}
