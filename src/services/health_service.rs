use crate::adapters::database::DbPool;
use crate::config::HealthConfig;
use crate::services::realtime::Realtime;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::time::Duration;
use tokio::time::timeout;

#[derive(Clone, Debug)]
pub struct Metrics {
    pub status: Gauge<i64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("marketplace-messaging");
        Self {
            status: meter
                .i64_gauge("messaging_health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct HealthService {
    pool: DbPool,
    realtime: Realtime,
    config: HealthConfig,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(pool: DbPool, realtime: Realtime, config: HealthConfig) -> Self {
        Self { pool, realtime, config, metrics: Metrics::new() }
    }

    /// Checks database connectivity.
    ///
    /// # Errors
    /// Returns a string describing the failure if the database is unreachable.
    pub async fn check_db(&self) -> Result<(), String> {
        let db_timeout = Duration::from_millis(self.config.db_timeout_ms);

        let result = match timeout(db_timeout, sqlx::query("SELECT 1").execute(&self.pool)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(format!("Database connection failed: {e:?}")),
            Err(_) => Err("Database connection timed out".to_string()),
        };

        self.record("database", result.is_ok());
        result
    }

    /// Checks the realtime transport. A disabled transport counts as healthy.
    ///
    /// # Errors
    /// Returns a string describing the failure if the transport is unreachable.
    pub async fn check_realtime(&self) -> Result<(), String> {
        let realtime_timeout = Duration::from_millis(self.config.realtime_timeout_ms);

        let result = match timeout(realtime_timeout, self.realtime.ping()).await {
            Ok(None | Some(Ok(()))) => Ok(()),
            Ok(Some(Err(e))) => Err(format!("Realtime transport failed: {e:?}")),
            Err(_) => Err("Realtime transport timed out".to_string()),
        };

        self.record("realtime", result.is_ok());
        result
    }

    fn record(&self, component: &'static str, ok: bool) {
        self.metrics.status.record(i64::from(ok), &[KeyValue::new("component", component)]);
    }
}
