pub(crate) mod session;

use crate::domain::realtime::Topic;
use crate::services::conversation_service::ConversationService;
use crate::services::gateway::session::Session;
use crate::services::realtime::TopicHub;
use axum::extract::ws::WebSocket;
use opentelemetry::{
    global,
    metrics::{Counter, UpDownCounter},
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) active_connections: UpDownCounter<i64>,
    pub(crate) lagged_total: Counter<u64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("marketplace-messaging");
        Self {
            active_connections: meter
                .i64_up_down_counter("messaging_gateway_active_connections")
                .with_description("Number of open realtime WebSocket connections")
                .build(),
            lagged_total: meter
                .u64_counter("messaging_gateway_lagged_total")
                .with_description("Events skipped because a client fell behind")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Streams realtime events to connected clients.
#[derive(Clone, Debug)]
pub struct GatewayService {
    hub: Arc<TopicHub>,
    conversations: ConversationService,
    metrics: Metrics,
}

impl GatewayService {
    #[must_use]
    pub fn new(hub: Arc<TopicHub>, conversations: ConversationService) -> Self {
        Self { hub, conversations, metrics: Metrics::new() }
    }

    /// Topics `user_id` may follow: always their own, plus a conversation they belong to.
    async fn topics_for(&self, user_id: Uuid, conversation_id: Option<Uuid>) -> Vec<Topic> {
        let mut topics = vec![Topic::User(user_id)];

        if let Some(conversation_id) = conversation_id {
            match self.conversations.is_participant(conversation_id, user_id).await {
                Ok(true) => topics.push(Topic::Conversation(conversation_id)),
                Ok(false) => {
                    tracing::warn!(%conversation_id, "Refusing conversation subscription for non-participant");
                }
                Err(e) => {
                    tracing::error!(error = %e, %conversation_id, "Failed to check conversation membership");
                }
            }
        }

        topics
    }

    pub async fn handle_socket(
        &self,
        socket: WebSocket,
        user_id: Uuid,
        conversation_id: Option<Uuid>,
        request_id: String,
        shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let topics = self.topics_for(user_id, conversation_id).await;
        let receivers = topics.iter().map(|topic| self.hub.subscribe(&topic.to_string())).collect();

        let session = Session {
            user_id,
            request_id,
            socket,
            receivers,
            metrics: self.metrics.clone(),
            shutdown_rx,
        };

        session.run().await;
    }
}
