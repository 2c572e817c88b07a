//! In-memory repositories and recording collaborators shared by the unit tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::api::error;
use crate::configs::CacheStore;
use crate::modules::conversation::{
    model::{InsertConversation, NewParticipant},
    repository::{ConversationRepository, ParticipantRepository},
    schema::{ConversationEntity, ConversationType, ParticipantEntity, ParticipantRole},
};
use crate::modules::fanout::MessageNotice;
use crate::modules::message::{
    model::InsertMessage,
    repository::MessageRepository,
    schema::{MessageEntity, MessageType, MessageView},
};
use crate::modules::notification::{
    model::{NewNotification, PushAlert},
    push::PushGateway,
    repository::NotificationRepository,
    schema::NotificationEntity,
    service::MessageNotifier,
};
use crate::modules::receipt::{
    repository::ReceiptRepository,
    schema::{ReceiptEntity, ReceiptStatus, UnreadCount},
};
use crate::modules::websocket::{broadcaster::Broadcaster, message::ChatEvent};

pub fn sample_view(conversation_id: Uuid) -> MessageView {
    MessageView {
        id: Uuid::now_v7(),
        conversation_id,
        sender_id: Some(Uuid::now_v7()),
        sender_name: "alice".to_string(),
        sender_avatar: None,
        content: Some("hi".to_string()),
        message_type: MessageType::Text,
        sent_at: Utc::now(),
        file_url: None,
        file_name: None,
        file_size: None,
        file_type: None,
        thumbnail_url: None,
    }
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, String>,
    conversations: HashMap<Uuid, ConversationEntity>,
    participants: Vec<ParticipantEntity>,
    messages: Vec<MessageEntity>,
    receipts: Vec<ReceiptEntity>,
    private_pairs: HashMap<String, Uuid>,
}

impl State {
    fn view(&self, message: &MessageEntity) -> MessageView {
        let sender_name = match message.sender_id {
            Some(id) => self.users.get(&id).cloned().unwrap_or_else(|| "System".to_string()),
            None => "System".to_string(),
        };

        MessageView {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            sender_name,
            sender_avatar: None,
            content: message.content.clone(),
            message_type: message.message_type,
            sent_at: message.sent_at,
            file_url: message.file_url.clone(),
            file_name: message.file_name.clone(),
            file_size: message.file_size,
            file_type: message.file_type.clone(),
            thumbnail_url: message.thumbnail_url.clone(),
        }
    }

    fn insert_participant(&mut self, conversation_id: Uuid, member: &NewParticipant) -> ParticipantEntity {
        let participant = ParticipantEntity {
            conversation_id,
            user_id: member.user_id,
            role: member.role,
            joined_at: Utc::now(),
        };
        self.participants.push(participant.clone());
        participant
    }

    fn insert_receipts(&mut self, message: &MessageEntity, recipients: &[Uuid]) {
        for user_id in recipients {
            self.receipts.push(ReceiptEntity {
                message_id: message.id,
                user_id: *user_id,
                conversation_id: message.conversation_id,
                status: ReceiptStatus::Sent,
                updated_at: Utc::now(),
            });
        }
    }
}

/// One store backing every repository trait, so services under test share state.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    fail_receipts: AtomicBool,
    advance_writes: AtomicUsize,
    miss_private_lookup: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(&self, display_name: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.state.lock().unwrap().users.insert(id, display_name.to_string());
        id
    }

    /// The first member becomes admin.
    pub fn seed_conversation(&self, _type: ConversationType, members: &[Uuid]) -> Uuid {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut state = self.state.lock().unwrap();

        state.conversations.insert(
            id,
            ConversationEntity {
                id,
                _type,
                group_name: matches!(_type, ConversationType::Group).then(|| "group".to_string()),
                group_avatar_url: None,
                created_by: members.first().copied(),
                created_at: now,
                updated_at: now,
            },
        );

        for (i, user_id) in members.iter().enumerate() {
            let role = if i == 0 { ParticipantRole::Admin } else { ParticipantRole::Member };
            state.insert_participant(id, &NewParticipant { user_id: *user_id, role });
        }

        id
    }

    pub fn join(&self, conversation_id: Uuid, user_id: Uuid) {
        self.state
            .lock()
            .unwrap()
            .insert_participant(conversation_id, &NewParticipant { user_id, role: ParticipantRole::Member });
    }

    /// Stores a text message with SENT receipts for exactly `recipients`.
    pub fn seed_message(
        &self,
        conversation_id: Uuid,
        sender_id: Option<Uuid>,
        content: &str,
        recipients: &[Uuid],
    ) -> Uuid {
        let message = MessageEntity {
            id: Uuid::now_v7(),
            conversation_id,
            sender_id,
            content: Some(content.to_string()),
            message_type: if sender_id.is_some() { MessageType::Text } else { MessageType::System },
            file_url: None,
            file_name: None,
            file_size: None,
            file_type: None,
            thumbnail_url: None,
            sent_at: Utc::now(),
        };

        let mut state = self.state.lock().unwrap();
        state.insert_receipts(&message, recipients);
        let id = message.id;
        state.messages.push(message);
        id
    }

    pub fn receipt(&self, message_id: Uuid, user_id: Uuid) -> Option<ReceiptEntity> {
        self.state
            .lock()
            .unwrap()
            .receipts
            .iter()
            .find(|r| r.message_id == message_id && r.user_id == user_id)
            .cloned()
    }

    pub fn receipts_for(&self, message_id: Uuid) -> Vec<ReceiptEntity> {
        self.state
            .lock()
            .unwrap()
            .receipts
            .iter()
            .filter(|r| r.message_id == message_id)
            .cloned()
            .collect()
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }

    pub fn is_member(&self, conversation_id: Uuid, user_id: Uuid) -> bool {
        self.state
            .lock()
            .unwrap()
            .participants
            .iter()
            .any(|p| p.conversation_id == conversation_id && p.user_id == user_id)
    }

    /// The next `find_private_between` returns nothing, as if another request's
    /// insert had not committed yet.
    pub fn miss_next_private_lookup(&self) {
        self.miss_private_lookup.store(true, Ordering::SeqCst);
    }

    /// Number of conditional receipt updates issued so far.
    pub fn advance_writes(&self) -> usize {
        self.advance_writes.load(Ordering::SeqCst)
    }

    /// Makes receipt inserts fail, as a broken transaction would.
    pub fn fail_receipt_writes(&self, fail: bool) {
        self.fail_receipts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryStore {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        Ok(self.state.lock().unwrap().conversations.get(conversation_id).cloned())
    }

    async fn find_private_between(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        if self.miss_private_lookup.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }

        let state = self.state.lock().unwrap();
        let members_of = |conv: &Uuid| -> HashSet<Uuid> {
            state
                .participants
                .iter()
                .filter(|p| p.conversation_id == *conv)
                .map(|p| p.user_id)
                .collect()
        };

        Ok(state
            .conversations
            .values()
            .filter(|c| c._type == ConversationType::Private)
            .find(|c| {
                let members = members_of(&c.id);
                members.contains(user_a) && members.contains(user_b)
            })
            .cloned())
    }

    async fn find_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationEntity>, error::SystemError> {
        let state = self.state.lock().unwrap();
        let mut conversations: Vec<ConversationEntity> = state
            .participants
            .iter()
            .filter(|p| p.user_id == *user_id)
            .filter_map(|p| state.conversations.get(&p.conversation_id).cloned())
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn create_with_participants(
        &self,
        conversation: &InsertConversation,
    ) -> Result<ConversationEntity, error::SystemError> {
        let now = Utc::now();
        let created = ConversationEntity {
            id: Uuid::now_v7(),
            _type: conversation._type,
            group_name: conversation.group_name.clone(),
            group_avatar_url: conversation.group_avatar_url.clone(),
            created_by: Some(conversation.created_by),
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.lock().unwrap();
        if let Some(pair) = &conversation.private_pair {
            if state.private_pairs.contains_key(pair) {
                return Err(error::SystemError::Conflict(None));
            }
            state.private_pairs.insert(pair.clone(), created.id);
        }
        state.conversations.insert(created.id, created.clone());
        for member in &conversation.members {
            state.insert_participant(created.id, member);
        }

        Ok(created)
    }
}

#[async_trait::async_trait]
impl ParticipantRepository for InMemoryStore {
    async fn is_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        Ok(self.is_member(*conversation_id, *user_id))
    }

    async fn list_participant_ids(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        Ok(self
            .find_participants(conversation_id)
            .await?
            .into_iter()
            .map(|p| p.user_id)
            .collect())
    }

    async fn find_participants(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<ParticipantEntity>, error::SystemError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .participants
            .iter()
            .filter(|p| p.conversation_id == *conversation_id)
            .cloned()
            .collect())
    }

    async fn find_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ParticipantEntity>, error::SystemError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .participants
            .iter()
            .find(|p| p.conversation_id == *conversation_id && p.user_id == *user_id)
            .cloned())
    }

    async fn add_participant(
        &self,
        conversation_id: &Uuid,
        participant: &NewParticipant,
    ) -> Result<ParticipantEntity, error::SystemError> {
        Ok(self.state.lock().unwrap().insert_participant(*conversation_id, participant))
    }

    async fn remove_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let is_group = state
            .conversations
            .get(conversation_id)
            .is_some_and(|c| c._type == ConversationType::Group);
        if !is_group {
            return Ok(false);
        }

        let before = state.participants.len();
        state
            .participants
            .retain(|p| !(p.conversation_id == *conversation_id && p.user_id == *user_id));
        Ok(state.participants.len() < before)
    }
}

#[async_trait::async_trait]
impl MessageRepository for InMemoryStore {
    async fn create_with_receipts(
        &self,
        message: &InsertMessage,
        recipients: &[Uuid],
    ) -> Result<MessageView, error::SystemError> {
        if self.fail_receipts.load(Ordering::SeqCst) {
            return Err(error::SystemError::DatabaseError("receipt insert failed".into()));
        }

        let entity = MessageEntity {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content.clone(),
            message_type: message.message_type,
            file_url: message.file_url.clone(),
            file_name: message.file_name.clone(),
            file_size: message.file_size,
            file_type: message.file_type.clone(),
            thumbnail_url: message.thumbnail_url.clone(),
            sent_at: Utc::now(),
        };

        let mut state = self.state.lock().unwrap();
        state.insert_receipts(&entity, recipients);
        if let Some(conversation) = state.conversations.get_mut(&entity.conversation_id) {
            conversation.updated_at = entity.sent_at;
        }
        let view = state.view(&entity);
        state.messages.push(entity);

        Ok(view)
    }

    async fn find_page(
        &self,
        conversation_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageView>, error::SystemError> {
        let state = self.state.lock().unwrap();
        let mut messages: Vec<&MessageEntity> =
            state.messages.iter().filter(|m| m.conversation_id == *conversation_id).collect();
        messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));

        Ok(messages
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|m| state.view(m))
            .collect())
    }

    async fn find_latest_in(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<Vec<MessageView>, error::SystemError> {
        let state = self.state.lock().unwrap();
        Ok(conversation_ids
            .iter()
            .filter_map(|conversation_id| {
                state
                    .messages
                    .iter()
                    .filter(|m| m.conversation_id == *conversation_id)
                    .max_by(|a, b| a.sent_at.cmp(&b.sent_at).then(a.id.cmp(&b.id)))
                    .map(|m| state.view(m))
            })
            .collect())
    }

    async fn find_by_id(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        Ok(self.state.lock().unwrap().messages.iter().find(|m| m.id == *message_id).cloned())
    }
}

#[async_trait::async_trait]
impl ReceiptRepository for InMemoryStore {
    async fn find(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ReceiptEntity>, error::SystemError> {
        Ok(self.receipt(*message_id, *user_id))
    }

    async fn advance(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
        target: ReceiptStatus,
    ) -> Result<Option<ReceiptEntity>, error::SystemError> {
        self.advance_writes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let receipt = state
            .receipts
            .iter_mut()
            .find(|r| r.message_id == *message_id && r.user_id == *user_id)
            .filter(|r| r.status.can_advance_to(target));

        Ok(receipt.map(|r| {
            r.status = target;
            r.updated_at = Utc::now();
            r.clone()
        }))
    }

    async fn mark_conversation_read(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<u64, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let targets: Vec<Uuid> = state
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id && m.sender_id != Some(*user_id))
            .map(|m| m.id)
            .collect();

        let mut changed = 0;
        for message_id in targets {
            match state.receipts.iter_mut().find(|r| r.message_id == message_id && r.user_id == *user_id) {
                Some(r) if r.status.can_advance_to(ReceiptStatus::Read) => {
                    r.status = ReceiptStatus::Read;
                    r.updated_at = Utc::now();
                    changed += 1;
                }
                Some(_) => {}
                None => {
                    state.receipts.push(ReceiptEntity {
                        message_id,
                        user_id: *user_id,
                        conversation_id: *conversation_id,
                        status: ReceiptStatus::Read,
                        updated_at: Utc::now(),
                    });
                    changed += 1;
                }
            }
        }

        Ok(changed)
    }

    async fn find_by_message(
        &self,
        message_id: &Uuid,
    ) -> Result<Vec<ReceiptEntity>, error::SystemError> {
        Ok(self.receipts_for(*message_id))
    }

    async fn count_unread_by_conversation(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<UnreadCount>, error::SystemError> {
        let state = self.state.lock().unwrap();
        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for r in state.receipts.iter().filter(|r| r.user_id == *user_id && r.status < ReceiptStatus::Read) {
            *counts.entry(r.conversation_id).or_default() += 1;
        }

        let mut counts: Vec<UnreadCount> = counts
            .into_iter()
            .map(|(conversation_id, unread)| UnreadCount { conversation_id, unread })
            .collect();
        counts.sort_by_key(|c| c.conversation_id);
        Ok(counts)
    }
}

/// Records successful publishes; the first `failures` calls fail instead.
#[derive(Default)]
pub struct RecordingBroadcaster {
    events: Mutex<Vec<(Uuid, ChatEvent, Option<Uuid>)>>,
    failures: AtomicUsize,
}

impl RecordingBroadcaster {
    pub fn failing_first(failures: usize) -> Self {
        Self { events: Mutex::default(), failures: AtomicUsize::new(failures) }
    }

    pub fn events(&self) -> Vec<(Uuid, ChatEvent, Option<Uuid>)> {
        self.events.lock().unwrap().clone()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn publish(
        &self,
        conversation_id: Uuid,
        event: ChatEvent,
        skip_user_id: Option<Uuid>,
    ) -> Result<(), error::SystemError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(error::SystemError::transient("simulated network drop"));
        }

        self.events.lock().unwrap().push((conversation_id, event, skip_user_id));
        Ok(())
    }
}

/// Records every notice it is handed; the first `failures` calls also return an error.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<MessageNotice>>,
    failures: AtomicUsize,
}

impl RecordingNotifier {
    pub fn failing_first(failures: usize) -> Self {
        Self { notices: Mutex::default(), failures: AtomicUsize::new(failures) }
    }

    pub fn notices(&self) -> Vec<MessageNotice> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MessageNotifier for RecordingNotifier {
    async fn notify_new_message(
        &self,
        message: &MessageView,
        recipients: &[Uuid],
    ) -> Result<(), error::SystemError> {
        self.notices
            .lock()
            .unwrap()
            .push(MessageNotice { message: message.clone(), recipients: recipients.to_vec() });

        match self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)) {
            Ok(_) => Err(error::SystemError::transient("push provider unavailable")),
            Err(_) => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifications {
    created: Mutex<Vec<NewNotification>>,
}

impl RecordingNotifications {
    pub fn created(&self) -> Vec<NewNotification> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NotificationRepository for RecordingNotifications {
    async fn create(
        &self,
        notification: &NewNotification,
    ) -> Result<NotificationEntity, error::SystemError> {
        self.created.lock().unwrap().push(notification.clone());

        Ok(NotificationEntity {
            id: Uuid::now_v7(),
            user_id: notification.user_id,
            notification_type: notification.notification_type,
            title: notification.title.clone(),
            content: notification.content.clone(),
            related_entity_id: notification.related_entity_id,
            related_entity_type: notification.related_entity_type.clone(),
            is_read: false,
            created_at: Utc::now(),
        })
    }
}

/// Records pushes; users passed to `fail_for` get an error instead.
#[derive(Default)]
pub struct RecordingPushGateway {
    pushed: Mutex<Vec<(Uuid, PushAlert)>>,
    failing_users: Mutex<HashSet<Uuid>>,
}

impl RecordingPushGateway {
    pub fn fail_for(&self, user_id: Uuid) {
        self.failing_users.lock().unwrap().insert(user_id);
    }

    pub fn pushed(&self) -> Vec<(Uuid, PushAlert)> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PushGateway for RecordingPushGateway {
    async fn push(&self, user_id: &Uuid, alert: &PushAlert) -> Result<usize, error::SystemError> {
        if self.failing_users.lock().unwrap().contains(user_id) {
            return Err(error::SystemError::transient("push provider unavailable"));
        }

        self.pushed.lock().unwrap().push((*user_id, alert.clone()));
        Ok(1)
    }
}

/// Cache keyed like Redis, values held as JSON. Expiry is not modelled.
#[derive(Default)]
pub struct MemoryCache {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn get<T>(&self, key: &str) -> Result<Option<T>, error::SystemError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let raw = self.values.lock().unwrap().get(key).cloned();
        match raw {
            Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    async fn set<T>(&self, key: &str, value: &T, _expiration: usize) -> Result<(), error::SystemError>
    where
        T: serde::Serialize + Sync,
    {
        let serialized = serde_json::to_vec(value)?;
        self.values.lock().unwrap().insert(key.to_string(), serialized);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, error::SystemError> {
        let mut values = self.values.lock().unwrap();
        let current: i64 = match values.get(key) {
            Some(v) => serde_json::from_slice(v)?,
            None => 0,
        };
        let next = current + 1;
        values.insert(key.to_string(), serde_json::to_vec(&next)?);
        Ok(next)
    }
}
