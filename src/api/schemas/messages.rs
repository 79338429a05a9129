use crate::error::{AppError, Result};
use crate::services::message_service::SendMessage;
use serde::Deserialize;
use uuid::Uuid;

/// Body of `POST /messages`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: Option<String>,
    pub conversation_id: Option<String>,
    pub receiver_id: Option<String>,
    pub reservation_id: Option<String>,
}

impl SendMessageRequest {
    /// Parses a raw JSON body.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the body is not a JSON object of the expected shape.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))
    }
}

impl TryFrom<SendMessageRequest> for SendMessage {
    type Error = AppError;

    fn try_from(request: SendMessageRequest) -> Result<Self> {
        Ok(Self {
            content: request.content,
            conversation_id: parse_optional_id("conversationId", request.conversation_id)?,
            receiver_id: parse_optional_id("receiverId", request.receiver_id)?,
            reservation_id: parse_optional_id("reservationId", request.reservation_id)?,
        })
    }
}

/// Query of `GET /messages`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesQuery {
    pub conversation_id: Option<String>,
    pub receiver_id: Option<String>,
}

impl ListMessagesQuery {
    /// # Errors
    /// Returns `AppError::Validation` if an identifier is not a UUID.
    pub fn ids(self) -> Result<(Option<Uuid>, Option<Uuid>)> {
        Ok((
            parse_optional_id("conversationId", self.conversation_id)?,
            parse_optional_id("receiverId", self.receiver_id)?,
        ))
    }
}

/// Empty strings count as absent.
pub(crate) fn parse_optional_id(field: &str, raw: Option<String>) -> Result<Option<Uuid>> {
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => {
            Uuid::parse_str(value).map(Some).map_err(|_| AppError::Validation(format!("{field} is not a valid id")))
        }
    }
}
