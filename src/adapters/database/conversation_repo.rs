use crate::adapters::database::records::ConversationRecord;
use crate::domain::conversation::{Conversation, ParticipantPair};
use crate::error::Result;
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct ConversationRepository {}

impl ConversationRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Fetches a conversation by id.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_by_id(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<Conversation>> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            r#"
            SELECT id, participant_ids, last_message_at, reservation_id, created_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Returns the conversation whose participants are exactly `pair`, creating it if none exists.
    ///
    /// A single statement against the unique pair index, so concurrent callers for the same
    /// pair converge on one row. The returned flag is `true` when this call inserted it.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the statement fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_or_create_pair(
        &self,
        conn: &mut PgConnection,
        pair: ParticipantPair,
        reservation_id: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<(Conversation, bool)> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            conversation: ConversationRecord,
            inserted: bool,
        }

        let row = sqlx::query_as::<_, Row>(
            r#"
            INSERT INTO conversations (id, participant_ids, last_message_at, reservation_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (participant_ids) WHERE cardinality(participant_ids) = 2
            DO UPDATE SET participant_ids = conversations.participant_ids
            RETURNING id, participant_ids, last_message_at, reservation_id, created_at, (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(pair.to_vec())
        .bind(now)
        .bind(reservation_id)
        .fetch_one(conn)
        .await?;

        Ok((row.conversation.into(), row.inserted))
    }

    /// Finds a conversation whose participants include both users. Group conversations match too.
    ///
    /// Exact pairs are preferred, then the most recently active conversation.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_containing(
        &self,
        conn: &mut PgConnection,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Conversation>> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            r#"
            SELECT id, participant_ids, last_message_at, reservation_id, created_at
            FROM conversations
            WHERE participant_ids @> ARRAY[$1, $2]::uuid[]
            ORDER BY cardinality(participant_ids) ASC, last_message_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Advances `last_message_at`.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn touch(&self, conn: &mut PgConnection, id: Uuid, at: OffsetDateTime) -> Result<()> {
        sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(conn)
            .await?;
        Ok(())
    }
}
