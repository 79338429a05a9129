use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Client-visible body for every failure.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Authentication required")]
    AuthError,
    #[error("Not found")]
    NotFound,
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Internal server error")]
    Internal,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    // Every kind collapses to the same 500 body; the distinction only reaches the logs.
    fn into_response(self) -> Response {
        match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "Database error");
            }
            Self::AuthError => {
                tracing::debug!("Authentication required");
            }
            Self::NotFound => {
                tracing::debug!("Resource not found");
            }
            Self::Validation(msg) => {
                tracing::debug!(message = %msg, "Validation failed");
            }
            Self::Internal => {
                tracing::error!("Internal server error occurred");
            }
        }

        let body = Json(json!({
            "message": GENERIC_ERROR_MESSAGE
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn test_every_kind_maps_to_generic_500() {
        for error in [
            AppError::AuthError,
            AppError::NotFound,
            AppError::Validation("content is required".into()),
            AppError::Internal,
            AppError::Database(sqlx::Error::RowNotFound),
        ] {
            let (status, body) = body_of(error).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, json!({ "message": "An error occurred." }));
        }
    }
}
