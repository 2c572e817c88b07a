use uuid::Uuid;

use crate::{
    api::error,
    modules::notification::{model::NewNotification, schema::NotificationEntity},
};

#[async_trait::async_trait]
pub trait NotificationRepository {
    async fn create(
        &self,
        notification: &NewNotification,
    ) -> Result<NotificationEntity, error::SystemError>;
}

/// Read-only view of registered push devices.
#[async_trait::async_trait]
pub trait DeviceRepository {
    async fn find_active_tokens(&self, user_id: &Uuid) -> Result<Vec<String>, error::SystemError>;
}
