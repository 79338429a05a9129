use crate::adapters::database::records::NotificationRecord;
use crate::domain::notification::{NewNotification, Notification};
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct NotificationRepository {}

impl NotificationRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Stores an unread notification.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the recipient does not exist.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, notification), fields(user_id = %notification.user_id))]
    pub(crate) async fn create(&self, conn: &mut PgConnection, notification: &NewNotification) -> Result<Notification> {
        let result = sqlx::query_as::<_, NotificationRecord>(
            r#"
            INSERT INTO notifications (id, user_id, type, title, message, data, read)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE)
            RETURNING id, user_id, title, message, data, read, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(notification.user_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(Json(&notification.data))
        .fetch_one(conn)
        .await;

        match result {
            Ok(record) => Ok(record.into()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => {
                // Foreign key violation: recipient does not exist
                Err(AppError::NotFound)
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }
}
