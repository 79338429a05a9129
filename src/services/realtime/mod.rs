use crate::domain::realtime::RealtimeEvent;
use async_trait::async_trait;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;

pub mod hub;
pub mod relay;

pub use hub::TopicHub;
pub use relay::RedisRelay;

/// A bus that can carry encoded realtime envelopes to topic subscribers.
#[async_trait]
pub trait RealtimeTransport: Send + Sync + std::fmt::Debug {
    async fn publish(&self, topic: &str, frame: &str) -> anyhow::Result<()>;

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct Metrics {
    publish_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("marketplace-messaging");
        Self {
            publish_total: meter
                .u64_counter("messaging_realtime_publish_total")
                .with_description("Realtime publish attempts by outcome")
                .build(),
        }
    }
}

/// Realtime fan-out capability.
///
/// `Disabled` is a valid steady state: publishing is then a no-op.
#[derive(Clone, Debug, Default)]
pub enum Realtime {
    #[default]
    Disabled,
    Enabled(Broadcaster),
}

#[derive(Clone, Debug)]
pub struct Broadcaster {
    transport: Arc<dyn RealtimeTransport>,
    publish_timeout: Duration,
    metrics: Metrics,
}

impl Realtime {
    #[must_use]
    pub fn enabled(transport: Arc<dyn RealtimeTransport>, publish_timeout: Duration) -> Self {
        Self::Enabled(Broadcaster { transport, publish_timeout, metrics: Metrics::new() })
    }

    /// Publishes `events` in order on a detached task.
    ///
    /// Never fails: transport errors and timeouts are logged and counted. The handle is only
    /// useful to callers that want to wait for delivery; dropping it does not cancel the task.
    pub fn publish(&self, events: Vec<RealtimeEvent>) -> Option<JoinHandle<()>> {
        let Self::Enabled(broadcaster) = self else {
            tracing::debug!(count = events.len(), "Realtime disabled, skipping publish");
            return None;
        };

        if events.is_empty() {
            return None;
        }

        let broadcaster = broadcaster.clone();
        Some(tokio::spawn(
            async move {
                for event in events {
                    broadcaster.publish_one(&event).await;
                }
            }
            .instrument(tracing::debug_span!("realtime_publish")),
        ))
    }

    /// Checks the transport, `None` when realtime is disabled.
    pub async fn ping(&self) -> Option<anyhow::Result<()>> {
        match self {
            Self::Disabled => None,
            Self::Enabled(broadcaster) => Some(broadcaster.transport.ping().await),
        }
    }
}

impl Broadcaster {
    async fn publish_one(&self, event: &RealtimeEvent) {
        let frame = match event.encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, topic = %event.topic, "Failed to encode realtime event");
                self.metrics.publish_total.add(1, &[KeyValue::new("status", "encode_error")]);
                return;
            }
        };

        let status = match tokio::time::timeout(self.publish_timeout, self.transport.publish(&event.topic, &frame)).await
        {
            Ok(Ok(())) => "success",
            Ok(Err(e)) => {
                tracing::warn!(error = %e, topic = %event.topic, "Realtime publish failed");
                "failure"
            }
            Err(_) => {
                tracing::warn!(topic = %event.topic, "Realtime publish timed out");
                "timeout"
            }
        };

        self.metrics.publish_total.add(1, &[KeyValue::new("status", status)]);
    }
}
