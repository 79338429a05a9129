use crate::services::realtime::RealtimeTransport;
use async_trait::async_trait;
use dashmap::DashMap;
use opentelemetry::{
    global,
    metrics::{Counter, UpDownCounter},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

#[derive(Clone, Debug)]
struct Metrics {
    active_topics: UpDownCounter<i64>,
    unrouted_total: Counter<u64>,
    gc_reclaimed_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("marketplace-messaging");
        Self {
            active_topics: meter
                .i64_up_down_counter("messaging_realtime_active_topics")
                .with_description("Topics with at least one local subscriber channel")
                .build(),
            unrouted_total: meter
                .u64_counter("messaging_realtime_unrouted_total")
                .with_description("Events delivered to a topic with no local subscribers")
                .build(),
            gc_reclaimed_total: meter
                .u64_counter("messaging_realtime_gc_reclaimed_total")
                .with_description("Topic channels reclaimed because nobody was listening")
                .build(),
        }
    }
}

/// In-process topic fan-out.
///
/// Each topic lazily gets a broadcast channel; frames are the encoded JSON envelopes.
#[derive(Debug)]
pub struct TopicHub {
    topics: DashMap<String, broadcast::Sender<Arc<str>>>,
    channel_capacity: usize,
    metrics: Metrics,
}

impl TopicHub {
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        Self { topics: DashMap::new(), channel_capacity: channel_capacity.max(1), metrics: Metrics::new() }
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<Arc<str>> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| {
                self.metrics.active_topics.add(1, &[]);
                let (tx, _rx) = broadcast::channel(self.channel_capacity);
                tx
            })
            .value()
            .subscribe()
    }

    /// Hands a frame to the local subscribers of `topic`. Returns how many received it.
    pub fn deliver(&self, topic: &str, frame: Arc<str>) -> usize {
        if let Some(tx) = self.topics.get(topic) {
            // Err means every receiver is gone; GC will reclaim the entry
            tx.send(frame).unwrap_or(0)
        } else {
            self.metrics.unrouted_total.add(1, &[]);
            0
        }
    }

    /// Drops topics whose subscribers have all gone away.
    pub fn perform_gc(&self) -> usize {
        let mut reclaimed = 0;
        self.topics.retain(|_, sender| {
            let active = sender.receiver_count() > 0;
            if !active {
                reclaimed += 1;
            }
            active
        });

        if reclaimed > 0 {
            let count = i64::try_from(reclaimed).unwrap_or(i64::MAX);
            self.metrics.active_topics.add(-count, &[]);
            self.metrics.gc_reclaimed_total.add(reclaimed as u64, &[]);
        }
        reclaimed
    }

    pub async fn run_gc(self: Arc<Self>, interval_secs: u64, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let reclaimed = self.perform_gc();
                    if reclaimed > 0 {
                        tracing::debug!(reclaimed, "Reclaimed idle realtime topics");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    }

    /// Live receivers on `topic`, zero if it has never been subscribed.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |tx| tx.receiver_count())
    }

    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

#[async_trait]
impl RealtimeTransport for TopicHub {
    async fn publish(&self, topic: &str, frame: &str) -> anyhow::Result<()> {
        self.deliver(topic, Arc::from(frame));
        Ok(())
    }
}
