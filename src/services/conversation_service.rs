use crate::adapters::database::DbPool;
use crate::adapters::database::conversation_repo::ConversationRepository;
use crate::domain::conversation::{Conversation, ConversationTarget, HistoryTarget, ParticipantPair};
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

/// Finds or creates the conversation a message belongs to.
#[derive(Clone, Debug)]
pub struct ConversationService {
    pool: DbPool,
    repo: ConversationRepository,
}

impl ConversationService {
    #[must_use]
    pub const fn new(pool: DbPool, repo: ConversationRepository) -> Self {
        Self { pool, repo }
    }

    /// Resolves the conversation for an outgoing message.
    ///
    /// An explicit id must exist. A receiver resolves to the exact two-party conversation
    /// with the sender, which is created atomically on first contact.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if an explicit conversation does not exist.
    /// Returns `AppError::Validation` if the receiver is the sender.
    /// Returns `AppError::Database` if a query fails.
    #[tracing::instrument(level = "debug", err(level = "debug"), skip(self, conn))]
    pub(crate) async fn resolve(
        &self,
        conn: &mut PgConnection,
        current_user_id: Uuid,
        target: ConversationTarget,
        now: OffsetDateTime,
    ) -> Result<Conversation> {
        match target {
            ConversationTarget::Existing(id) => self.repo.find_by_id(conn, id).await?.ok_or(AppError::NotFound),
            ConversationTarget::Direct { receiver_id, reservation_id } => {
                let pair = ParticipantPair::new(current_user_id, receiver_id)?;
                let (conversation, inserted) = self.repo.find_or_create_pair(conn, pair, reservation_id, now).await?;
                if inserted {
                    tracing::info!(conversation_id = %conversation.id, "Conversation created");
                }
                Ok(conversation)
            }
        }
    }

    /// Finds the conversation whose history should be returned, if any.
    ///
    /// Lookup by receiver accepts any conversation containing both users.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", err(level = "debug"), skip(self, conn))]
    pub(crate) async fn find_for_history(
        &self,
        conn: &mut PgConnection,
        current_user_id: Uuid,
        target: HistoryTarget,
    ) -> Result<Option<Conversation>> {
        match target {
            HistoryTarget::Conversation(id) => self.repo.find_by_id(conn, id).await,
            HistoryTarget::Receiver(receiver_id) => self.repo.find_containing(conn, current_user_id, receiver_id).await,
        }
    }

    /// Advances the conversation's activity timestamp.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    pub(crate) async fn touch(&self, conn: &mut PgConnection, conversation_id: Uuid, at: OffsetDateTime) -> Result<()> {
        self.repo.touch(conn, conversation_id, at).await
    }

    /// Whether `user_id` participates in `conversation_id`.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    pub async fn is_participant(&self, conversation_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        let conversation = self.repo.find_by_id(&mut conn, conversation_id).await?;
        Ok(conversation.is_some_and(|c| c.has_participant(user_id)))
    }
}
