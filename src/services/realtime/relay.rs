use crate::adapters::redis::RedisRealtimeRepository;
use crate::domain::realtime::Topic;
use crate::services::realtime::TopicHub;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Feeds envelopes published on the shared Redis bus into this node's topic hub.
#[derive(Debug)]
pub struct RedisRelay {
    repo: RedisRealtimeRepository,
    hub: Arc<TopicHub>,
}

impl RedisRelay {
    #[must_use]
    pub const fn new(repo: RedisRealtimeRepository, hub: Arc<TopicHub>) -> Self {
        Self { repo, hub }
    }

    /// Subscribes to the bus and forwards until shutdown.
    ///
    /// # Errors
    /// Returns an error if the initial subscription fails.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let mut rx = self.repo.subscribe_all().await?;

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                msg = rx.recv() => match msg {
                    Ok(msg) => {
                        match self.repo.topic_of(&msg.channel).filter(|t| Topic::parse(t).is_some()) {
                            Some(topic) => {
                                self.hub.deliver(topic, Arc::from(msg.payload));
                            }
                            None => tracing::debug!(channel = %msg.channel, "Ignoring unknown realtime channel"),
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(missed = n, "Realtime relay lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        Ok(())
    }
}
