use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        message::{
            model::InsertMessage,
            repository::MessageRepository,
            schema::{MessageEntity, MessageView},
        },
        receipt::repository_pg::insert_sent_receipts,
    },
};

const VIEW_COLUMNS: &str = r#"
    m.id, m.conversation_id, m.sender_id,
    COALESCE(u.display_name, 'System') AS sender_name,
    u.avatar_url AS sender_avatar,
    m.content, m.message_type, m.sent_at,
    m.file_url, m.file_name, m.file_size, m.file_type, m.thumbnail_url
"#;

#[derive(Clone)]
pub struct MessagePgRepository {
    pool: sqlx::PgPool,
}

impl MessagePgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepository for MessagePgRepository {
    async fn create_with_receipts(
        &self,
        message: &InsertMessage,
        recipients: &[Uuid],
    ) -> Result<MessageView, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        // NOW() is the transaction start; history order must follow send order
        sqlx::query(
            r#"
            INSERT INTO messages (
                id, conversation_id, sender_id, content, message_type,
                file_url, file_name, file_size, file_type, thumbnail_url, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, clock_timestamp())
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.message_type)
        .bind(&message.file_url)
        .bind(&message.file_name)
        .bind(message.file_size)
        .bind(&message.file_type)
        .bind(&message.thumbnail_url)
        .execute(tx.as_mut())
        .await?;

        let receipts =
            insert_sent_receipts(&message.id, &message.conversation_id, recipients, tx.as_mut())
                .await?;

        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(message.conversation_id)
            .execute(tx.as_mut())
            .await?;

        let view = sqlx::query_as::<_, MessageView>(&format!(
            "SELECT {VIEW_COLUMNS} FROM messages m LEFT JOIN users u ON u.id = m.sender_id WHERE m.id = $1"
        ))
        .bind(message.id)
        .fetch_one(tx.as_mut())
        .await?;

        tx.commit().await?;

        log::debug!("Stored message {} with {} receipts", view.id, receipts);

        Ok(view)
    }

    async fn find_page(
        &self,
        conversation_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageView>, error::SystemError> {
        // served by index (conversation_id, sent_at DESC, id DESC)
        let messages = sqlx::query_as::<_, MessageView>(&format!(
            r#"
            SELECT {VIEW_COLUMNS}
            FROM messages m
            LEFT JOIN users u ON u.id = m.sender_id
            WHERE m.conversation_id = $1
            ORDER BY m.sent_at DESC, m.id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn find_latest_in(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<Vec<MessageView>, error::SystemError> {
        let messages = sqlx::query_as::<_, MessageView>(&format!(
            r#"
            SELECT latest.*
            FROM UNNEST($1::uuid[]) AS c(id)
            CROSS JOIN LATERAL (
                SELECT {VIEW_COLUMNS}
                FROM messages m
                LEFT JOIN users u ON u.id = m.sender_id
                WHERE m.conversation_id = c.id
                ORDER BY m.sent_at DESC, m.id DESC
                LIMIT 1
            ) latest
            "#
        ))
        .bind(conversation_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn find_by_id(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let message = sqlx::query_as::<_, MessageEntity>("SELECT * FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(message)
    }
}
