use crate::adapters::database::DbPool;
use crate::adapters::database::message_repo::MessageRepository;
use crate::domain::conversation::{ConversationTarget, HistoryTarget};
use crate::domain::message::{MessageContent, MessageWithSender};
use crate::domain::realtime::RealtimeEvent;
use crate::domain::user::User;
use crate::error::Result;
use crate::services::context_service::ContextService;
use crate::services::conversation_service::ConversationService;
use crate::services::notification_service::NotificationService;
use crate::services::realtime::Realtime;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    sent_total: Counter<u64>,
    history_size: Histogram<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("marketplace-messaging");
        Self {
            sent_total: meter
                .u64_counter("messaging_messages_sent_total")
                .with_description("Send attempts by outcome")
                .build(),
            history_size: meter
                .u64_histogram("messaging_history_size")
                .with_description("Number of messages returned by a history request")
                .build(),
        }
    }
}

/// A request to send a message, with identifiers already parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendMessage {
    pub content: Option<String>,
    pub conversation_id: Option<Uuid>,
    pub receiver_id: Option<Uuid>,
    pub reservation_id: Option<Uuid>,
}

#[derive(Clone, Debug)]
pub struct MessageService {
    pool: DbPool,
    repo: MessageRepository,
    conversations: ConversationService,
    context: ContextService,
    notifications: NotificationService,
    realtime: Realtime,
    metrics: Metrics,
}

impl MessageService {
    #[must_use]
    pub fn new(
        pool: DbPool,
        repo: MessageRepository,
        conversations: ConversationService,
        context: ContextService,
        notifications: NotificationService,
        realtime: Realtime,
    ) -> Self {
        Self { pool, repo, conversations, context, notifications, realtime, metrics: Metrics::new() }
    }

    /// Sends a message on behalf of `sender`.
    ///
    /// Conversation resolution, the insert, the activity bump and the recipient's
    /// notification commit together. Realtime events are published afterwards and
    /// cannot fail the call.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the content or both target identifiers are missing.
    /// Returns `AppError::NotFound` if a referenced conversation or user does not exist.
    /// Returns `AppError::Database` if any write fails.
    #[tracing::instrument(err(level = "warn"), skip(self, sender, command), fields(sender_id = %sender.id))]
    pub async fn send_message(&self, sender: &User, command: SendMessage) -> Result<MessageWithSender> {
        let content = MessageContent::parse(command.content)?;
        let target =
            ConversationTarget::from_parts(command.conversation_id, command.receiver_id, command.reservation_id)?;

        let result = self.persist(sender, target, &content).await;

        let (message, notification_event) = match result {
            Ok(persisted) => {
                self.metrics.sent_total.add(1, &[KeyValue::new("status", "success")]);
                persisted
            }
            Err(e) => {
                self.metrics.sent_total.add(1, &[KeyValue::new("status", "failure")]);
                return Err(e);
            }
        };

        tracing::debug!(message_id = %message.message.id, conversation_id = %message.message.conversation_id, "Message stored");

        let mut events = vec![RealtimeEvent::new_message(message.clone())];
        events.extend(notification_event);
        drop(self.realtime.publish(events));

        Ok(message)
    }

    async fn persist(
        &self,
        sender: &User,
        target: ConversationTarget,
        content: &MessageContent,
    ) -> Result<(MessageWithSender, Option<RealtimeEvent>)> {
        let mut tx = self.pool.begin().await?;

        let conversation = self.conversations.resolve(&mut tx, sender.id, target, OffsetDateTime::now_utc()).await?;
        let message = self.append(&mut tx, conversation.id, sender.id, content).await?;
        let listing_title = self.context.listing_title(&mut tx, &conversation).await;
        self.conversations.touch(&mut tx, conversation.id, OffsetDateTime::now_utc()).await?;
        let notification_event =
            self.notifications.dispatch(&mut tx, &conversation, &message.message, sender, listing_title).await?;

        tx.commit().await?;

        Ok((message, notification_event))
    }

    /// Appends a message to an existing conversation.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation does not exist.
    /// Returns `AppError::Database` if the insert fails.
    pub(crate) async fn append(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &MessageContent,
    ) -> Result<MessageWithSender> {
        self.repo.create(conn, conversation_id, sender_id, content).await
    }

    /// Returns a conversation's messages, oldest first.
    ///
    /// A missing conversation yields an empty history.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if neither identifier is given.
    /// Returns `AppError::Database` if a query fails.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn history(
        &self,
        current_user_id: Uuid,
        conversation_id: Option<Uuid>,
        receiver_id: Option<Uuid>,
    ) -> Result<Vec<MessageWithSender>> {
        let target = HistoryTarget::from_parts(conversation_id, receiver_id)?;

        let mut conn = self.pool.acquire().await?;
        let Some(conversation) = self.conversations.find_for_history(&mut conn, current_user_id, target).await? else {
            return Ok(Vec::new());
        };

        let messages = self.repo.list_for_conversation(&mut conn, conversation.id).await?;
        self.metrics.history_size.record(messages.len() as u64, &[]);

        Ok(messages)
    }
}
