use crate::domain::notification::{Notification, NotificationData, NotificationKind};
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct NotificationRecord {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) data: Json<NotificationData>,
    pub(crate) read: bool,
    pub(crate) created_at: OffsetDateTime,
}

impl From<NotificationRecord> for Notification {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            kind: NotificationKind::Message,
            title: record.title,
            message: record.message,
            data: record.data.0,
            read: record.read,
            created_at: record.created_at,
        }
    }
}
