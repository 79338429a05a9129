use crate::domain::message::{Message, MessageWithSender};
use crate::domain::user::SenderProfile;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct MessageWithSenderRecord {
    pub(crate) id: Uuid,
    pub(crate) conversation_id: Uuid,
    pub(crate) sender_id: Uuid,
    pub(crate) content: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) sender_name: String,
    pub(crate) sender_image: Option<String>,
}

impl From<MessageWithSenderRecord> for MessageWithSender {
    fn from(record: MessageWithSenderRecord) -> Self {
        Self {
            message: Message {
                id: record.id,
                content: record.content,
                sender_id: record.sender_id,
                conversation_id: record.conversation_id,
                created_at: record.created_at,
            },
            sender: SenderProfile { id: record.sender_id, name: record.sender_name, image: record.sender_image },
        }
    }
}
