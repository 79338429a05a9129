use crate::adapters::database::DbPool;
use crate::adapters::database::user_repo::UserRepository;
use crate::domain::auth::Claims;
use crate::domain::user::User;
use crate::error::{AppError, Result};

/// Turns a bearer token into the verified current user.
#[derive(Clone, Debug)]
pub struct IdentityService {
    pool: DbPool,
    repo: UserRepository,
    jwt_secret: String,
}

impl IdentityService {
    #[must_use]
    pub const fn new(pool: DbPool, repo: UserRepository, jwt_secret: String) -> Self {
        Self { pool, repo, jwt_secret }
    }

    /// Verifies `token` and loads the user it names.
    ///
    /// # Errors
    /// Returns `AppError::AuthError` if the token is invalid or the user no longer exists.
    /// Returns `AppError::Database` if the lookup fails.
    #[tracing::instrument(err(level = "debug"), skip_all, fields(user_id = tracing::field::Empty))]
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let claims = Claims::decode(token, &self.jwt_secret)?;

        let mut conn = self.pool.acquire().await?;
        let user = self.repo.find_by_id(&mut conn, claims.sub).await?.ok_or(AppError::AuthError)?;

        tracing::Span::current().record("user_id", tracing::field::display(user.id));
        Ok(user)
    }
}
