use uuid::Uuid;

use crate::{
    api::error,
    modules::receipt::{
        repository::ReceiptRepository,
        schema::{ReceiptEntity, ReceiptStatus, UnreadCount},
    },
};

#[derive(Clone)]
pub struct ReceiptPgRepository {
    pool: sqlx::PgPool,
}

impl ReceiptPgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

/// Inserts one SENT receipt per recipient. Runs on the caller's executor so the
/// message insert and its receipts commit together.
pub(crate) async fn insert_sent_receipts<'e, E>(
    message_id: &Uuid,
    conversation_id: &Uuid,
    recipients: &[Uuid],
    tx: E,
) -> Result<u64, error::SystemError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    if recipients.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO message_receipts (message_id, user_id, conversation_id, status)
        SELECT $1, r.user_id, $2, $4
        FROM UNNEST($3::uuid[]) AS r(user_id)
        "#,
    )
    .bind(message_id)
    .bind(conversation_id)
    .bind(recipients)
    .bind(ReceiptStatus::Sent)
    .execute(tx)
    .await?;

    Ok(result.rows_affected())
}

#[async_trait::async_trait]
impl ReceiptRepository for ReceiptPgRepository {
    async fn find(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ReceiptEntity>, error::SystemError> {
        let receipt = sqlx::query_as::<_, ReceiptEntity>(
            "SELECT * FROM message_receipts WHERE message_id = $1 AND user_id = $2",
        )
        .bind(message_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(receipt)
    }

    async fn advance(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
        target: ReceiptStatus,
    ) -> Result<Option<ReceiptEntity>, error::SystemError> {
        // the row lock makes a concurrent update re-check `status < $3` after it commits
        let receipt = sqlx::query_as::<_, ReceiptEntity>(
            r#"
            UPDATE message_receipts
            SET status = $3, updated_at = NOW()
            WHERE message_id = $1
            AND user_id = $2
            AND status < $3
            RETURNING *
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .bind(target)
        .fetch_optional(&self.pool)
        .await?;

        Ok(receipt)
    }

    async fn mark_conversation_read(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<u64, error::SystemError> {
        let result = sqlx::query(
            r#"
            INSERT INTO message_receipts (message_id, user_id, conversation_id, status, updated_at)
            SELECT m.id, $2, m.conversation_id, $3, NOW()
            FROM messages m
            WHERE m.conversation_id = $1
            AND m.sender_id IS DISTINCT FROM $2
            ON CONFLICT (message_id, user_id) DO UPDATE
            SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
            WHERE message_receipts.status < EXCLUDED.status
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(ReceiptStatus::Read)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_by_message(
        &self,
        message_id: &Uuid,
    ) -> Result<Vec<ReceiptEntity>, error::SystemError> {
        let receipts = sqlx::query_as::<_, ReceiptEntity>(
            "SELECT * FROM message_receipts WHERE message_id = $1 ORDER BY user_id",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(receipts)
    }

    async fn count_unread_by_conversation(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<UnreadCount>, error::SystemError> {
        let counts = sqlx::query_as::<_, UnreadCount>(
            r#"
            SELECT conversation_id, COUNT(*) AS unread
            FROM message_receipts
            WHERE user_id = $1
            AND status < $2
            GROUP BY conversation_id
            ORDER BY conversation_id
            "#,
        )
        .bind(user_id)
        .bind(ReceiptStatus::Read)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
