use crate::api::AppState;
use crate::api::middleware::CurrentUser;
use crate::api::schemas::messages::{ListMessagesQuery, SendMessageRequest};
use crate::domain::message::MessageWithSender;
use crate::error::{AppError, Result};
use crate::services::message_service::SendMessage;
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::BytesRejection},
    http::Uri,
};

/// `POST /v1/messages`
///
/// The body is decoded by hand so malformed or oversized bodies surface through `AppError` like every other failure.
pub async fn send_message(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<MessageWithSender>> {
    let body = body.map_err(|e| AppError::Validation(format!("Unreadable request body: {e}")))?;
    let command = SendMessage::try_from(SendMessageRequest::from_json(&body)?)?;
    let message = state.message_service.send_message(&user, command).await?;
    Ok(Json(message))
}

/// `GET /v1/messages?conversationId=...` or `GET /v1/messages?receiverId=...`
pub async fn list_messages(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Json<Vec<MessageWithSender>>> {
    let Query(query) = Query::<ListMessagesQuery>::try_from_uri(&uri)
        .map_err(|e| AppError::Validation(format!("Invalid query: {e}")))?;
    let (conversation_id, receiver_id) = query.ids()?;

    let messages = state.message_service.history(user.id, conversation_id, receiver_id).await?;
    Ok(Json(messages))
}
