use crate::adapters::database::reservation_repo::ReservationRepository;
use crate::domain::conversation::Conversation;
use crate::domain::notification::DEFAULT_LISTING_TITLE;
use crate::error::AppError;
use sqlx::{Connection, PgConnection};

/// Derives the listing label shown in message notifications.
#[derive(Clone, Debug)]
pub struct ContextService {
    repo: ReservationRepository,
}

impl ContextService {
    #[must_use]
    pub const fn new(repo: ReservationRepository) -> Self {
        Self { repo }
    }

    /// Title of the listing behind the conversation's reservation.
    ///
    /// Falls back to [`DEFAULT_LISTING_TITLE`] when anything along the way is missing or the
    /// lookup fails. The lookup runs in a savepoint so a failure leaves the caller's
    /// transaction usable.
    #[tracing::instrument(level = "debug", skip_all, fields(conversation_id = %conversation.id))]
    pub(crate) async fn listing_title(&self, conn: &mut PgConnection, conversation: &Conversation) -> String {
        let Some(reservation_id) = conversation.reservation_id else {
            return DEFAULT_LISTING_TITLE.to_string();
        };

        let lookup = async {
            let mut savepoint = conn.begin().await?;
            let title = self.repo.find_listing_title(&mut savepoint, reservation_id).await?;
            savepoint.commit().await?;
            Ok::<_, AppError>(title)
        }
        .await;

        match lookup {
            Ok(Some(title)) if !title.is_empty() => title,
            Ok(_) => {
                tracing::debug!(%reservation_id, "No listing title for reservation");
                DEFAULT_LISTING_TITLE.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, %reservation_id, "Listing lookup failed, using default title");
                DEFAULT_LISTING_TITLE.to_string()
            }
        }
    }
}
