use crate::error::Result;
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct ReservationRepository {}

impl ReservationRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Looks up the title of the listing booked by a reservation.
    ///
    /// `None` when the reservation, its listing, or the title is missing.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_listing_title(
        &self,
        conn: &mut PgConnection,
        reservation_id: Uuid,
    ) -> Result<Option<String>> {
        let title: Option<Option<String>> = sqlx::query_scalar(
            r#"
            SELECT l.title
            FROM reservations r
            LEFT JOIN listings l ON l.id = r.listing_id
            WHERE r.id = $1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(conn)
        .await?;

        Ok(title.flatten())
    }
}
