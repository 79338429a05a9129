use crate::adapters::redis::{PubSubMessage, RedisClient};
use crate::services::realtime::RealtimeTransport;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Publishes realtime envelopes on `{prefix}{topic}` channels.
#[derive(Debug, Clone)]
pub struct RedisRealtimeRepository {
    redis: Arc<RedisClient>,
    channel_prefix: String,
}

impl RedisRealtimeRepository {
    #[must_use]
    pub const fn new(redis: Arc<RedisClient>, channel_prefix: String) -> Self {
        Self { redis, channel_prefix }
    }

    #[must_use]
    pub fn channel_name(&self, topic: &str) -> String {
        format!("{}{topic}", self.channel_prefix)
    }

    /// Maps a channel name back to its topic, if it belongs to this prefix.
    #[must_use]
    pub fn topic_of<'a>(&self, channel: &'a str) -> Option<&'a str> {
        channel.strip_prefix(self.channel_prefix.as_str())
    }

    /// Subscribes to every realtime topic.
    ///
    /// # Errors
    /// Returns an error if the subscription fails.
    pub async fn subscribe_all(&self) -> anyhow::Result<broadcast::Receiver<PubSubMessage>> {
        let pattern = format!("{}*", self.channel_prefix);
        self.redis.subscribe(&pattern).await
    }
}

#[async_trait]
impl RealtimeTransport for RedisRealtimeRepository {
    async fn publish(&self, topic: &str, frame: &str) -> anyhow::Result<()> {
        let mut conn = self.redis.publisher();
        conn.publish::<_, _, i64>(self.channel_name(topic), frame).await?;
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.redis.ping().await
    }
}
