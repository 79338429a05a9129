use crate::adapters::database::records::MessageWithSenderRecord;
use crate::domain::message::{MessageContent, MessageWithSender};
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct MessageRepository {}

impl MessageRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Appends a message to a conversation and returns it with its sender projection.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation or sender does not exist.
    /// Returns `AppError::Validation` if the content violates the table constraint.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, content))]
    pub(crate) async fn create(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &MessageContent,
    ) -> Result<MessageWithSender> {
        let result = sqlx::query_as::<_, MessageWithSenderRecord>(
            r#"
            WITH inserted AS (
                INSERT INTO messages (id, conversation_id, sender_id, content)
                VALUES ($1, $2, $3, $4)
                RETURNING id, conversation_id, sender_id, content, created_at
            )
            SELECT i.id, i.conversation_id, i.sender_id, i.content, i.created_at,
                   u.name AS sender_name, u.image AS sender_image
            FROM inserted i
            JOIN users u ON u.id = i.sender_id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content.as_str())
        .fetch_one(conn)
        .await;

        match result {
            Ok(record) => Ok(record.into()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => {
                // Foreign key violation: conversation or sender does not exist
                Err(AppError::NotFound)
            }
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23514") => {
                Err(AppError::Validation("content violates message constraints".into()))
            }
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("22021") => {
                // Text Postgres cannot store, e.g. a NUL byte
                Err(AppError::Validation("content is not valid text".into()))
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// Fetches the full history of a conversation, oldest first.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn list_for_conversation(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
    ) -> Result<Vec<MessageWithSender>> {
        let records = sqlx::query_as::<_, MessageWithSenderRecord>(
            r#"
            SELECT m.id, m.conversation_id, m.sender_id, m.content, m.created_at,
                   u.name AS sender_name, u.image AS sender_image
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.conversation_id = $1
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
