use crate::domain::user::SenderProfile;
use crate::error::{AppError, Result};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Non-empty message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    /// # Errors
    /// Returns `AppError::Validation` if the content is absent or empty.
    pub fn parse(raw: Option<String>) -> Result<Self> {
        match raw {
            Some(text) if !text.is_empty() => Ok(Self(text)),
            _ => Err(AppError::Validation("content is required".into())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub sender_id: Uuid,
    pub conversation_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A message together with its sender projection, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageWithSender {
    #[serde(flatten)]
    pub message: Message,
    pub sender: SenderProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_content_must_be_present_and_non_empty() {
        assert!(MessageContent::parse(None).is_err());
        assert!(MessageContent::parse(Some(String::new())).is_err());
        assert_eq!(MessageContent::parse(Some(" ".into())).unwrap().as_str(), " ");
    }

    #[test]
    fn test_message_json_shape() {
        let sender_id = Uuid::new_v4();
        let conversation_id = Uuid::new_v4();
        let id = Uuid::new_v4();
        let message = MessageWithSender {
            message: Message {
                id,
                content: "Hi there".into(),
                sender_id,
                conversation_id,
                created_at: datetime!(2026-03-01 12:00:00 UTC),
            },
            sender: SenderProfile { id: sender_id, name: "Alice".into(), image: None },
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "id": id,
                "content": "Hi there",
                "senderId": sender_id,
                "conversationId": conversation_id,
                "createdAt": "2026-03-01T12:00:00Z",
                "sender": { "id": sender_id, "name": "Alice", "image": null },
            })
        );
    }
}
