/// Participant list cache
///
/// Membership is checked on every send and every subscribe, so participant ids are
/// cached under `participants:{conversation_id}:{generation}`. Every membership change
/// bumps the conversation's generation counter after the database write, so a list
/// read before the change can only ever be stored under a generation nobody reads
/// again. A cache failure is logged and the lookup falls through to the wrapped
/// repository.
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::error,
    configs::{CacheStore, RedisCache},
    modules::conversation::{
        model::NewParticipant, repository::ParticipantRepository, schema::ParticipantEntity,
    },
};

const PARTICIPANTS_PREFIX: &str = "participants:";
const GENERATION_PREFIX: &str = "participants-gen:";

#[derive(Clone)]
pub struct CachedParticipantRepository<R, S = RedisCache>
where
    R: ParticipantRepository + Send + Sync,
    S: CacheStore + Send + Sync,
{
    inner: R,
    cache: Arc<S>,
    ttl: usize,
}

impl<R, S> CachedParticipantRepository<R, S>
where
    R: ParticipantRepository + Send + Sync,
    S: CacheStore + Send + Sync,
{
    pub fn new(inner: R, cache: Arc<S>, ttl: usize) -> Self {
        Self { inner, cache, ttl }
    }

    fn key(conversation_id: &Uuid, generation: i64) -> String {
        format!("{PARTICIPANTS_PREFIX}{conversation_id}:{generation}")
    }

    fn generation_key(conversation_id: &Uuid) -> String {
        format!("{GENERATION_PREFIX}{conversation_id}")
    }

    async fn generation(&self, conversation_id: &Uuid) -> Result<i64, error::SystemError> {
        let generation = self.cache.get::<i64>(&Self::generation_key(conversation_id)).await?;
        Ok(generation.unwrap_or(0))
    }

    async fn invalidate(&self, conversation_id: &Uuid) {
        if let Err(e) = self.cache.incr(&Self::generation_key(conversation_id)).await {
            log::error!("Failed to invalidate participant cache for {}: {}", conversation_id, e);
        }
    }
}

#[async_trait::async_trait]
impl<R, S> ParticipantRepository for CachedParticipantRepository<R, S>
where
    R: ParticipantRepository + Send + Sync,
    S: CacheStore + Send + Sync,
{
    async fn is_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let ids = self.list_participant_ids(conversation_id).await?;
        Ok(ids.contains(user_id))
    }

    async fn list_participant_ids(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        // read before the database so a concurrent change always lands on a newer generation
        let generation = match self.generation(conversation_id).await {
            Ok(generation) => generation,
            Err(e) => {
                log::warn!("Participant cache unavailable for {}: {}", conversation_id, e);
                return self.inner.list_participant_ids(conversation_id).await;
            }
        };
        let key = Self::key(conversation_id, generation);

        match self.cache.get::<Vec<Uuid>>(&key).await {
            Ok(Some(ids)) => return Ok(ids),
            Ok(None) => {}
            Err(e) => log::warn!("Participant cache read failed for {}: {}", conversation_id, e),
        }

        let ids = self.inner.list_participant_ids(conversation_id).await?;

        // an empty list means unknown conversation or no members yet; never cache it
        if !ids.is_empty() {
            if let Err(e) = self.cache.set(&key, &ids, self.ttl).await {
                log::warn!("Participant cache write failed for {}: {}", conversation_id, e);
            }
        }

        Ok(ids)
    }

    async fn find_participants(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<ParticipantEntity>, error::SystemError> {
        self.inner.find_participants(conversation_id).await
    }

    async fn find_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ParticipantEntity>, error::SystemError> {
        self.inner.find_participant(conversation_id, user_id).await
    }

    async fn add_participant(
        &self,
        conversation_id: &Uuid,
        participant: &NewParticipant,
    ) -> Result<ParticipantEntity, error::SystemError> {
        let added = self.inner.add_participant(conversation_id, participant).await?;
        self.invalidate(conversation_id).await;
        Ok(added)
    }

    async fn remove_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let removed = self.inner.remove_participant(conversation_id, user_id).await?;
        if removed {
            self.invalidate(conversation_id).await;
        }
        Ok(removed)
    }
}
