use crate::error::{AppError, Result};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn new(user_id: Uuid, ttl_secs: u64) -> Self {
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        let expiration = OffsetDateTime::now_utc().unix_timestamp().saturating_add(ttl);
        Self { sub: user_id, exp: expiration }
    }

    /// Signs the claims with an HMAC secret.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if encoding fails.
    pub fn encode(&self, secret: &str) -> Result<String> {
        encode(&Header::default(), self, &EncodingKey::from_secret(secret.as_bytes())).map_err(|_| AppError::Internal)
    }

    /// Verifies the signature and expiry of a token.
    ///
    /// # Errors
    /// Returns `AppError::AuthError` if the token is malformed, expired, or signed with another secret.
    pub fn decode(token: &str, secret: &str) -> Result<Self> {
        let token_data = decode::<Self>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
            .map_err(|_| AppError::AuthError)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = Claims::new(user_id, 60).encode("secret").unwrap();
        let claims = Claims::decode(&token, "secret").unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = Claims::new(Uuid::new_v4(), 60).encode("secret").unwrap();
        assert!(matches!(Claims::decode(&token, "other"), Err(AppError::AuthError)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let claims = Claims { sub: Uuid::new_v4(), exp: OffsetDateTime::now_utc().unix_timestamp() - 3600 };
        let token = claims.encode("secret").unwrap();
        assert!(matches!(Claims::decode(&token, "secret"), Err(AppError::AuthError)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(Claims::decode("not-a-jwt", "secret"), Err(AppError::AuthError)));
    }
}
