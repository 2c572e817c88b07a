use uuid::Uuid;

use crate::modules::conversation::model::{InsertConversation, NewParticipant};
use crate::modules::conversation::repository::{ConversationRepository, ParticipantRepository};
use crate::modules::conversation::schema::{ConversationType, ParticipantEntity};
use crate::{api::error, modules::conversation::schema::ConversationEntity};

#[derive(Clone)]
pub struct ConversationPgRepository {
    pool: sqlx::PgPool,
}

impl ConversationPgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_participant<'e, E>(
    conversation_id: &Uuid,
    participant: &NewParticipant,
    tx: E,
) -> Result<ParticipantEntity, error::SystemError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let entity = sqlx::query_as::<_, ParticipantEntity>(
        r#"
        INSERT INTO participants (conversation_id, user_id, role)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(conversation_id)
    .bind(participant.user_id)
    .bind(participant.role)
    .fetch_one(tx)
    .await?;

    Ok(entity)
}

#[async_trait::async_trait]
impl ConversationRepository for ConversationPgRepository {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let conversation =
            sqlx::query_as::<_, ConversationEntity>("SELECT * FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    async fn find_private_between(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let conversation = sqlx::query_as::<_, ConversationEntity>(
            r#"
            SELECT c.*
            FROM conversations c
            WHERE c.type = 'private'
            AND EXISTS (
                SELECT 1
                FROM participants p1
                WHERE p1.conversation_id = c.id
                AND p1.user_id = $1
            )
            AND EXISTS (
                SELECT 1
                FROM participants p2
                WHERE p2.conversation_id = c.id
                AND p2.user_id = $2
            )
            ORDER BY c.created_at
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn find_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationEntity>, error::SystemError> {
        let conversations = sqlx::query_as::<_, ConversationEntity>(
            r#"
            SELECT c.*
            FROM conversations c
            JOIN participants p
                ON p.conversation_id = c.id
            AND p.user_id = $1
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    async fn create_with_participants(
        &self,
        conversation: &InsertConversation,
    ) -> Result<ConversationEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let id = Uuid::now_v7();
        let created = sqlx::query_as::<_, ConversationEntity>(
            r#"
            INSERT INTO conversations (
                id, type, group_name, group_avatar_url, created_by, private_pair
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(conversation._type)
        .bind(&conversation.group_name)
        .bind(&conversation.group_avatar_url)
        .bind(conversation.created_by)
        .bind(&conversation.private_pair)
        .fetch_one(tx.as_mut())
        .await?;

        for member in &conversation.members {
            insert_participant(&created.id, member, tx.as_mut()).await?;
        }

        tx.commit().await?;

        log::debug!(
            "Created {:?} conversation {} with {} participants",
            created._type,
            created.id,
            conversation.members.len()
        );

        Ok(created)
    }
}

#[derive(Clone)]
pub struct ParticipantPgRepository {
    pool: sqlx::PgPool,
}

impl ParticipantPgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ParticipantRepository for ParticipantPgRepository {
    async fn is_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM participants
                WHERE conversation_id = $1
                AND user_id = $2
            )
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_participant_ids(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM participants WHERE conversation_id = $1 ORDER BY joined_at",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn find_participants(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<ParticipantEntity>, error::SystemError> {
        let participants = sqlx::query_as::<_, ParticipantEntity>(
            "SELECT * FROM participants WHERE conversation_id = $1 ORDER BY joined_at",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn find_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ParticipantEntity>, error::SystemError> {
        let participant = sqlx::query_as::<_, ParticipantEntity>(
            "SELECT * FROM participants WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    async fn add_participant(
        &self,
        conversation_id: &Uuid,
        participant: &NewParticipant,
    ) -> Result<ParticipantEntity, error::SystemError> {
        insert_participant(conversation_id, participant, &self.pool).await
    }

    async fn remove_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        // PRIVATE membership is immutable
        let result = sqlx::query(
            r#"
            DELETE FROM participants p
            USING conversations c
            WHERE p.conversation_id = c.id
            AND c.type = $3
            AND p.conversation_id = $1
            AND p.user_id = $2
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(ConversationType::Group)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
