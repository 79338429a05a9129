use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub realtime: RealtimeConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,

    #[command(flatten)]
    pub health: HealthConfig,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[arg(long = "database-url", env = "MESSAGING_DATABASE_URL")]
    pub url: String,

    /// Maximum number of pooled connections
    #[arg(long = "db-max-connections", env = "MESSAGING_DB_MAX_CONNECTIONS", default_value_t = 20)]
    pub max_connections: u32,

    /// Minimum number of idle connections kept open
    #[arg(long = "db-min-connections", env = "MESSAGING_DB_MIN_CONNECTIONS", default_value_t = 2)]
    pub min_connections: u32,

    /// Seconds to wait for a free connection before failing
    #[arg(long = "db-acquire-timeout-secs", env = "MESSAGING_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,

    /// Seconds an idle connection is kept before being closed
    #[arg(long = "db-idle-timeout-secs", env = "MESSAGING_DB_IDLE_TIMEOUT_SECS", default_value_t = 300)]
    pub idle_timeout_secs: u64,

    /// Maximum lifetime of a pooled connection in seconds
    #[arg(long = "db-max-lifetime-secs", env = "MESSAGING_DB_MAX_LIFETIME_SECS", default_value_t = 1800)]
    pub max_lifetime_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "MESSAGING_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the public API
    #[arg(long, env = "MESSAGING_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for liveness and readiness probes
    #[arg(long, env = "MESSAGING_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Seconds to wait for background tasks during shutdown
    #[arg(long, env = "MESSAGING_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MESSAGING_MAX_BODY_BYTES", default_value_t = 16 * 1024 * 1024)]
    pub max_body_bytes: usize,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Secret key used to verify session JWTs
    #[arg(long, env = "MESSAGING_JWT_SECRET")]
    pub jwt_secret: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RealtimeBackend {
    /// Realtime publishing is disabled
    None,
    /// In-process topic hub, single node only
    Local,
    /// Redis pub/sub shared by every node
    Redis,
}

#[derive(Clone, Debug, Args)]
pub struct RealtimeConfig {
    /// Transport used for realtime fan-out
    #[arg(long = "realtime-backend", env = "MESSAGING_REALTIME_BACKEND", value_enum, default_value_t = RealtimeBackend::Local)]
    pub backend: RealtimeBackend,

    /// Redis URL, required by the redis backend
    #[arg(long = "redis-url", env = "MESSAGING_REDIS_URL")]
    pub redis_url: Option<String>,

    /// Prefix prepended to topic names on the redis bus
    #[arg(long = "realtime-channel-prefix", env = "MESSAGING_REALTIME_CHANNEL_PREFIX", default_value = "realtime:")]
    pub channel_prefix: String,

    /// Upper bound on a single publish before it is abandoned
    #[arg(long = "realtime-publish-timeout-ms", env = "MESSAGING_REALTIME_PUBLISH_TIMEOUT_MS", default_value_t = 2000)]
    pub publish_timeout_ms: u64,

    /// Buffered events per topic before slow subscribers lag
    #[arg(long = "realtime-channel-capacity", env = "MESSAGING_REALTIME_CHANNEL_CAPACITY", default_value_t = 64)]
    pub channel_capacity: usize,

    /// How often topics without subscribers are reclaimed
    #[arg(long = "realtime-gc-interval-secs", env = "MESSAGING_REALTIME_GC_INTERVAL_SECS", default_value_t = 60)]
    pub gc_interval_secs: u64,

    /// Minimum reconnect delay for the redis relay
    #[arg(long = "realtime-min-backoff-secs", env = "MESSAGING_REALTIME_MIN_BACKOFF_SECS", default_value_t = 1)]
    pub min_backoff_secs: u64,

    /// Maximum reconnect delay for the redis relay
    #[arg(long = "realtime-max-backoff-secs", env = "MESSAGING_REALTIME_MAX_BACKOFF_SECS", default_value_t = 30)]
    pub max_backoff_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            backend: RealtimeBackend::Local,
            redis_url: None,
            channel_prefix: "realtime:".to_string(),
            publish_timeout_ms: 2000,
            channel_capacity: 64,
            gc_interval_secs: 60,
            min_backoff_secs: 1,
            max_backoff_secs: 30,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "MESSAGING_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; traces and metrics are exported only when set
    #[arg(long, env = "MESSAGING_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    /// Timeout for the database readiness check
    #[arg(long = "health-db-timeout-ms", env = "MESSAGING_HEALTH_DB_TIMEOUT_MS", default_value_t = 2000)]
    pub db_timeout_ms: u64,

    /// Timeout for the realtime transport readiness check
    #[arg(long = "health-realtime-timeout-ms", env = "MESSAGING_HEALTH_REALTIME_TIMEOUT_MS", default_value_t = 2000)]
    pub realtime_timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { db_timeout_ms: 2000, realtime_timeout_ms: 2000 }
    }
}
