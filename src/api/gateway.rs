use crate::api::AppState;
use crate::api::middleware::bearer_token;
use crate::api::schemas::messages::parse_optional_id;
use crate::error::{AppError, Result};
use axum::{
    Extension,
    extract::{Query, State, WebSocketUpgrade, ws::rejection::WebSocketUpgradeRejection},
    http::{HeaderMap, Uri},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_http::request_id::RequestId;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayParams {
    token: Option<String>,
    conversation_id: Option<String>,
}

impl GatewayParams {
    fn from_uri(uri: &Uri) -> Self {
        Query::<Self>::try_from_uri(uri).map(|q| q.0).unwrap_or_default()
    }

    fn conversation_id(&self) -> Result<Option<Uuid>> {
        parse_optional_id("conversationId", self.conversation_id.clone())
    }
}

/// `GET /v1/gateway`
///
/// Browsers cannot set headers on a WebSocket handshake, so the token may also arrive as `?token=`.
pub async fn websocket_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    request_id: Option<Extension<RequestId>>,
    ws: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let params = GatewayParams::from_uri(&uri);

    let request_id = request_id
        .as_ref()
        .and_then(|Extension(id)| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let Some(token) = bearer_token(&headers).map(str::to_owned).or_else(|| params.token.clone()) else {
        return AppError::AuthError.into_response();
    };

    let user = match state.identity_service.authenticate(&token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "WebSocket handshake failed: invalid token");
            return e.into_response();
        }
    };

    let conversation_id = match params.conversation_id() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let shutdown_rx = state.shutdown_rx.clone();
    let gateway = state.gateway_service.clone();

    ws.on_upgrade(move |socket| async move {
        gateway.handle_socket(socket, user.id, conversation_id, request_id, shutdown_rx).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(query: &str) -> GatewayParams {
        GatewayParams::from_uri(&format!("/v1/gateway?{query}").parse().unwrap())
    }

    #[test]
    fn test_token_survives_malformed_conversation_id() {
        let params = params("token=abc&conversationId=not-a-uuid");
        assert_eq!(params.token.as_deref(), Some("abc"));
        assert!(matches!(params.conversation_id(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_parses_conversation_id() {
        let id = Uuid::new_v4();
        let params = params(&format!("token=abc&conversationId={id}"));
        assert_eq!(params.conversation_id().unwrap(), Some(id));
    }

    #[test]
    fn test_missing_or_empty_conversation_id_is_absent() {
        assert_eq!(params("token=abc").conversation_id().unwrap(), None);
        assert_eq!(params("token=abc&conversationId=").conversation_id().unwrap(), None);
    }
}
