/// Push Gateway
///
/// Sends alerts to a user's registered devices through the Expo push API.
/// Device registration belongs to another service; only active tokens are read.
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::error,
    modules::notification::{
        model::{ExpoPushMessage, PushAlert},
        repository::DeviceRepository,
    },
};

#[async_trait::async_trait]
pub trait PushGateway {
    /// Pushes `alert` to every active device of `user_id`. Returns how many
    /// devices were targeted; a user without devices is not an error.
    async fn push(&self, user_id: &Uuid, alert: &PushAlert) -> Result<usize, error::SystemError>;
}

pub struct ExpoPushGateway<D>
where
    D: DeviceRepository + Send + Sync,
{
    http_client: reqwest::Client,
    api_url: String,
    devices: Arc<D>,
}

impl<D> ExpoPushGateway<D>
where
    D: DeviceRepository + Send + Sync,
{
    pub fn new(api_url: impl Into<String>, devices: Arc<D>) -> Self {
        Self { http_client: reqwest::Client::new(), api_url: api_url.into(), devices }
    }
}

#[async_trait::async_trait]
impl<D> PushGateway for ExpoPushGateway<D>
where
    D: DeviceRepository + Send + Sync,
{
    async fn push(&self, user_id: &Uuid, alert: &PushAlert) -> Result<usize, error::SystemError> {
        let tokens = self.devices.find_active_tokens(user_id).await?;
        if tokens.is_empty() {
            log::debug!("No active devices for user {}", user_id);
            return Ok(0);
        }

        let messages: Vec<ExpoPushMessage<'_>> = tokens
            .iter()
            .map(|token| ExpoPushMessage {
                to: token,
                sound: "default",
                title: &alert.title,
                body: &alert.body,
                data: &alert.data,
                priority: "high",
                channel_id: "default",
            })
            .collect();

        let response = self
            .http_client
            .post(&self.api_url)
            .header("Accept", "application/json")
            .json(&messages)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error::SystemError::transient(format!(
                "Push API returned {status}: {body}"
            )));
        }

        log::debug!("Pushed to {} devices of user {}", messages.len(), user_id);

        Ok(messages.len())
    }
}
