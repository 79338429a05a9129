use crate::domain::conversation::Conversation;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct ConversationRecord {
    pub(crate) id: Uuid,
    pub(crate) participant_ids: Vec<Uuid>,
    pub(crate) last_message_at: OffsetDateTime,
    pub(crate) reservation_id: Option<Uuid>,
    pub(crate) created_at: OffsetDateTime,
}

impl From<ConversationRecord> for Conversation {
    fn from(record: ConversationRecord) -> Self {
        Self {
            id: record.id,
            participant_ids: record.participant_ids,
            last_message_at: record.last_message_at,
            reservation_id: record.reservation_id,
            created_at: record.created_at,
        }
    }
}
