use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::error,
    modules::conversation::{
        model::{
            private_pair_key, ConversationDetail, ConversationSummary, InsertConversation,
            NewConversation, NewParticipant,
        },
        repository::{ConversationRepository, ParticipantRepository},
        schema::{ConversationEntity, ConversationType, ParticipantEntity, ParticipantRole},
    },
    modules::message::{repository::MessageRepository, schema::MessageView},
};

/// Loads the conversation and fails unless `user_id` belongs to it.
///
/// `NotFound` for an unknown conversation, `Forbidden` for a non-member.
pub async fn require_participant<C, P>(
    conversations: &C,
    participants: &P,
    conversation_id: &Uuid,
    user_id: &Uuid,
) -> Result<ConversationEntity, error::SystemError>
where
    C: ConversationRepository + Send + Sync + ?Sized,
    P: ParticipantRepository + Send + Sync + ?Sized,
{
    let conversation = conversations
        .find_by_id(conversation_id)
        .await?
        .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

    if !participants.is_participant(conversation_id, user_id).await? {
        return Err(error::SystemError::forbidden("You are not a member of this conversation"));
    }

    Ok(conversation)
}

#[derive(Clone)]
pub struct ConversationService<C, P, M>
where
    C: ConversationRepository + Send + Sync + 'static,
    P: ParticipantRepository + Send + Sync + 'static,
    M: MessageRepository + Send + Sync + 'static,
{
    conversation_repo: Arc<C>,
    participant_repo: Arc<P>,
    message_repo: Arc<M>,
}

impl<C, P, M> ConversationService<C, P, M>
where
    C: ConversationRepository + Send + Sync + 'static,
    P: ParticipantRepository + Send + Sync + 'static,
    M: MessageRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(
        conversation_repo: Arc<C>,
        participant_repo: Arc<P>,
        message_repo: Arc<M>,
    ) -> Self {
        ConversationService { conversation_repo, participant_repo, message_repo }
    }

    /// Used by the WebSocket session before subscribing it to a room.
    pub async fn ensure_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<ConversationEntity, error::SystemError> {
        require_participant(
            self.conversation_repo.as_ref(),
            self.participant_repo.as_ref(),
            &conversation_id,
            &user_id,
        )
        .await
    }

    pub async fn create_conversation(
        &self,
        creator_id: Uuid,
        request: NewConversation,
    ) -> Result<ConversationDetail, error::SystemError> {
        request.validate()?;

        let mut others: Vec<Uuid> = Vec::with_capacity(request.participant_ids.len());
        for id in request.participant_ids {
            if id != creator_id && !others.contains(&id) {
                others.push(id);
            }
        }

        let (group_name, group_avatar_url, private_pair) = match request._type {
            ConversationType::Private => {
                let [other] = others.as_slice() else {
                    return Err(error::SystemError::bad_request(
                        "A private conversation needs exactly one other participant",
                    ));
                };

                if let Some(existing) =
                    self.conversation_repo.find_private_between(&creator_id, other).await?
                {
                    log::debug!("Reusing private conversation {}", existing.id);
                    return self.detail(existing).await;
                }

                (None, None, Some(private_pair_key(&creator_id, other)))
            }
            ConversationType::Group => {
                let name = request
                    .group_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| error::SystemError::bad_request("Group name is required"))?;

                if others.is_empty() {
                    return Err(error::SystemError::bad_request(
                        "A group needs at least one other participant",
                    ));
                }

                (Some(name.to_string()), request.group_avatar_url, None)
            }
        };

        let other = others.first().copied();

        let mut members = Vec::with_capacity(others.len() + 1);
        members.push(NewParticipant { user_id: creator_id, role: ParticipantRole::Admin });
        members.extend(
            others.into_iter().map(|user_id| NewParticipant { user_id, role: ParticipantRole::Member }),
        );

        let is_private = private_pair.is_some();
        let created = self
            .conversation_repo
            .create_with_participants(&InsertConversation {
                _type: request._type,
                group_name,
                group_avatar_url,
                created_by: creator_id,
                private_pair,
                members,
            })
            .await;

        let conversation = match (created, other) {
            (Ok(conversation), _) => conversation,
            // another request created the same pair first
            (Err(error::SystemError::Conflict(_)), Some(other)) if is_private => self
                .conversation_repo
                .find_private_between(&creator_id, &other)
                .await?
                .ok_or_else(|| error::SystemError::Conflict(None))?,
            (Err(e), _) => return Err(e),
        };

        self.detail(conversation).await
    }

    pub async fn get_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<ConversationDetail, error::SystemError> {
        let conversation = self.ensure_participant(conversation_id, user_id).await?;
        self.detail(conversation).await
    }

    /// The user's conversations, most recently active first, each with its newest message.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, error::SystemError> {
        let conversations = self.conversation_repo.find_by_user(&user_id).await?;
        let ids: Vec<Uuid> = conversations.iter().map(|c| c.id).collect();

        let mut latest: HashMap<Uuid, MessageView> = self
            .message_repo
            .find_latest_in(&ids)
            .await?
            .into_iter()
            .map(|m| (m.conversation_id, m))
            .collect();

        Ok(conversations
            .into_iter()
            .map(|conversation| ConversationSummary {
                last_message: latest.remove(&conversation.id),
                conversation,
            })
            .collect())
    }

    pub async fn add_member(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<ParticipantEntity, error::SystemError> {
        let conversation = self.ensure_participant(conversation_id, actor_id).await?;
        Self::require_group(&conversation)?;
        self.require_admin(&conversation_id, &actor_id).await?;

        if self.participant_repo.is_participant(&conversation_id, &user_id).await? {
            return Err(error::SystemError::bad_request("User is already a member"));
        }

        let participant = self
            .participant_repo
            .add_participant(
                &conversation_id,
                &NewParticipant { user_id, role: ParticipantRole::Member },
            )
            .await?;

        log::info!("User {} added {} to conversation {}", actor_id, user_id, conversation_id);

        Ok(participant)
    }

    /// Removes `user_id` from a group. Admins may remove anyone; members may only leave.
    pub async fn remove_member(
        &self,
        actor_id: Uuid,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), error::SystemError> {
        let conversation = self.ensure_participant(conversation_id, actor_id).await?;
        Self::require_group(&conversation)?;

        if actor_id != user_id {
            self.require_admin(&conversation_id, &actor_id).await?;
        }

        if !self.participant_repo.remove_participant(&conversation_id, &user_id).await? {
            return Err(error::SystemError::not_found("Member not found"));
        }

        log::info!("User {} removed {} from conversation {}", actor_id, user_id, conversation_id);

        Ok(())
    }

    fn require_group(conversation: &ConversationEntity) -> Result<(), error::SystemError> {
        match conversation._type {
            ConversationType::Group => Ok(()),
            ConversationType::Private => Err(error::SystemError::bad_request(
                "Members of a private conversation cannot be changed",
            )),
        }
    }

    async fn require_admin(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<(), error::SystemError> {
        let participant = self.participant_repo.find_participant(conversation_id, user_id).await?;

        match participant {
            Some(p) if p.role == ParticipantRole::Admin => Ok(()),
            _ => Err(error::SystemError::forbidden("Only group admins can manage members")),
        }
    }

    async fn detail(
        &self,
        conversation: ConversationEntity,
    ) -> Result<ConversationDetail, error::SystemError> {
        let participants = self.participant_repo.find_participants(&conversation.id).await?;
        Ok(ConversationDetail { conversation, participants })
    }
}
