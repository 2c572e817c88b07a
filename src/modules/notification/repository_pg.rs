use uuid::Uuid;

use crate::{
    api::error,
    modules::notification::{
        model::NewNotification,
        repository::{DeviceRepository, NotificationRepository},
        schema::NotificationEntity,
    },
};

#[derive(Clone)]
pub struct NotificationPgRepository {
    pool: sqlx::PgPool,
}

impl NotificationPgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NotificationRepository for NotificationPgRepository {
    async fn create(
        &self,
        notification: &NewNotification,
    ) -> Result<NotificationEntity, error::SystemError> {
        let created = sqlx::query_as::<_, NotificationEntity>(
            r#"
            INSERT INTO notifications (
                id, user_id, notification_type, title, content,
                related_entity_id, related_entity_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(notification.user_id)
        .bind(notification.notification_type)
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(notification.related_entity_id)
        .bind(&notification.related_entity_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }
}

#[derive(Clone)]
pub struct DevicePgRepository {
    pool: sqlx::PgPool,
}

impl DevicePgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DeviceRepository for DevicePgRepository {
    async fn find_active_tokens(&self, user_id: &Uuid) -> Result<Vec<String>, error::SystemError> {
        let tokens: Vec<String> = sqlx::query_scalar(
            "SELECT push_token FROM devices WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tokens)
    }
}
