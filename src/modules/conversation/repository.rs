use uuid::Uuid;

use crate::{
    api::error,
    modules::conversation::{
        model::{InsertConversation, NewParticipant},
        schema::{ConversationEntity, ParticipantEntity},
    },
};

#[async_trait::async_trait]
pub trait ConversationRepository {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError>;

    async fn find_private_between(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError>;

    /// Conversations the user belongs to, most recently active first.
    async fn find_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationEntity>, error::SystemError>;

    /// Inserts the conversation and all of its participants in one transaction.
    async fn create_with_participants(
        &self,
        conversation: &InsertConversation,
    ) -> Result<ConversationEntity, error::SystemError>;
}

#[async_trait::async_trait]
pub trait ParticipantRepository {
    async fn is_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError>;

    async fn list_participant_ids(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<Uuid>, error::SystemError>;

    async fn find_participants(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<ParticipantEntity>, error::SystemError>;

    async fn find_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ParticipantEntity>, error::SystemError>;

    async fn add_participant(
        &self,
        conversation_id: &Uuid,
        participant: &NewParticipant,
    ) -> Result<ParticipantEntity, error::SystemError>;

    async fn remove_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError>;
}
