use crate::domain::conversation::Conversation;
use crate::domain::message::Message;
use crate::domain::user::User;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Label used when a conversation has no resolvable listing.
pub const DEFAULT_LISTING_TITLE: &str = "Unknown Property";

/// Longest preview kept verbatim, in characters.
pub const PREVIEW_MAX_CHARS: usize = 100;

const PREVIEW_ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Message,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub listing_title: String,
}

/// A notification ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: NotificationData,
}

impl NewNotification {
    #[must_use]
    pub fn for_message(
        recipient_id: Uuid,
        conversation: &Conversation,
        message: &Message,
        sender: &User,
        listing_title: String,
    ) -> Self {
        Self {
            user_id: recipient_id,
            kind: NotificationKind::Message,
            title: message_title(&sender.name),
            message: preview(&message.content),
            data: NotificationData {
                conversation_id: conversation.id,
                message_id: message.id,
                sender_id: sender.id,
                sender_name: sender.name.clone(),
                listing_title,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: NotificationData,
    pub read: bool,
    pub created_at: OffsetDateTime,
}

#[must_use]
pub fn message_title(sender_name: &str) -> String {
    format!("New message from {sender_name}")
}

/// Shortens `content` to [`PREVIEW_MAX_CHARS`] characters plus an ellipsis.
#[must_use]
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_MAX_CHARS) {
        Some((cut, _)) => format!("{}{PREVIEW_ELLIPSIS}", &content[..cut]),
        None => content.to_string(),
    }
}
