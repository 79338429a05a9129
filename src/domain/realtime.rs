use crate::domain::message::MessageWithSender;
use crate::domain::notification::{NewNotification, NotificationData, NotificationKind};
use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

const CONVERSATION_TOPIC_PREFIX: &str = "conversation-";
const USER_TOPIC_PREFIX: &str = "user-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Conversation(Uuid),
    User(Uuid),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conversation(id) => write!(f, "{CONVERSATION_TOPIC_PREFIX}{id}"),
            Self::User(id) => write!(f, "{USER_TOPIC_PREFIX}{id}"),
        }
    }
}

impl Topic {
    /// Parses a topic name produced by `Display`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(id) = name.strip_prefix(CONVERSATION_TOPIC_PREFIX) {
            return Uuid::parse_str(id).ok().map(Self::Conversation);
        }
        name.strip_prefix(USER_TOPIC_PREFIX).and_then(|id| Uuid::parse_str(id).ok()).map(Self::User)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    NewMessage,
    NewNotification,
}

/// Notification as pushed to a live client.
///
/// `id` and `created_at` are minted at publish time and do not match the stored notification row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: NotificationData,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl NotificationEvent {
    #[must_use]
    pub fn ephemeral(notification: &NewNotification, now: OffsetDateTime) -> Self {
        Self {
            id: (now.unix_timestamp_nanos() / 1_000_000).to_string(),
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            data: notification.data.clone(),
            read: false,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Message(MessageWithSender),
    Notification(NotificationEvent),
}

/// Envelope written to every transport and forwarded verbatim to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RealtimeEvent {
    pub topic: String,
    pub event: EventKind,
    pub payload: EventPayload,
}

impl RealtimeEvent {
    #[must_use]
    pub fn new_message(message: MessageWithSender) -> Self {
        Self {
            topic: Topic::Conversation(message.message.conversation_id).to_string(),
            event: EventKind::NewMessage,
            payload: EventPayload::Message(message),
        }
    }

    #[must_use]
    pub fn new_notification(recipient_id: Uuid, notification: NotificationEvent) -> Self {
        Self {
            topic: Topic::User(recipient_id).to_string(),
            event: EventKind::NewNotification,
            payload: EventPayload::Notification(notification),
        }
    }

    /// Serializes the envelope for the wire.
    ///
    /// # Errors
    /// Returns an error if the payload cannot be represented as JSON.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
