use crate::adapters::database::notification_repo::NotificationRepository;
use crate::domain::conversation::Conversation;
use crate::domain::message::Message;
use crate::domain::notification::NewNotification;
use crate::domain::realtime::{NotificationEvent, RealtimeEvent};
use crate::domain::user::User;
use crate::error::Result;
use opentelemetry::{global, metrics::Counter};
use sqlx::PgConnection;
use time::OffsetDateTime;

#[derive(Clone, Debug)]
struct Metrics {
    created_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("marketplace-messaging");
        Self {
            created_total: meter
                .u64_counter("messaging_notifications_created_total")
                .with_description("Message notifications stored for recipients")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct NotificationService {
    repo: NotificationRepository,
    metrics: Metrics,
}

impl NotificationService {
    #[must_use]
    pub fn new(repo: NotificationRepository) -> Self {
        Self { repo, metrics: Metrics::new() }
    }

    /// Stores a notification for the participant who did not send `message`.
    ///
    /// Returns the event announcing it to the recipient, or `None` when the sender is the only participant.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the recipient does not exist.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", err(level = "debug"), skip_all, fields(conversation_id = %conversation.id))]
    pub(crate) async fn dispatch(
        &self,
        conn: &mut PgConnection,
        conversation: &Conversation,
        message: &Message,
        sender: &User,
        listing_title: String,
    ) -> Result<Option<RealtimeEvent>> {
        let Some(recipient_id) = conversation.other_participant(sender.id) else {
            tracing::debug!("No other participant, skipping notification");
            return Ok(None);
        };

        let pending = NewNotification::for_message(recipient_id, conversation, message, sender, listing_title);
        let notification = self.repo.create(conn, &pending).await?;
        self.metrics.created_total.add(1, &[]);
        tracing::debug!(notification_id = %notification.id, recipient_id = %recipient_id, "Notification stored");

        // The live copy gets its own id and timestamp rather than the stored row's.
        let event = RealtimeEvent::new_notification(
            recipient_id,
            NotificationEvent::ephemeral(&pending, OffsetDateTime::now_utc()),
        );

        Ok(Some(event))
    }
}
