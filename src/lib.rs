#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;

use crate::adapters::database::DbPool;
use crate::adapters::database::conversation_repo::ConversationRepository;
use crate::adapters::database::message_repo::MessageRepository;
use crate::adapters::database::notification_repo::NotificationRepository;
use crate::adapters::database::reservation_repo::ReservationRepository;
use crate::adapters::database::user_repo::UserRepository;
use crate::adapters::redis::{RedisClient, RedisRealtimeRepository};
use crate::api::ServiceContainer;
use crate::config::{Config, RealtimeBackend};
use crate::services::context_service::ContextService;
use crate::services::conversation_service::ConversationService;
use crate::services::gateway::GatewayService;
use crate::services::health_service::HealthService;
use crate::services::identity_service::IdentityService;
use crate::services::message_service::MessageService;
use crate::services::notification_service::NotificationService;
use crate::services::realtime::{Realtime, RealtimeTransport, RedisRelay, TopicHub};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Applies pending schema migrations.
///
/// # Errors
/// Returns an error if a migration fails.
pub async fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through tracing so they reach the structured log.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map(|l| format!("{}:{}", l.file(), l.line())).unwrap_or_default();
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());

        tracing::error!(%location, panic = %payload, "Thread panicked");
    }));
}

/// Background tasks owned by the application.
#[derive(Debug)]
pub struct Workers {
    hub: Arc<TopicHub>,
    gc_interval_secs: u64,
    relay: Option<RedisRelay>,
}

impl Workers {
    /// Spawns every worker; each stops when `shutdown_rx` flips.
    #[must_use]
    pub fn spawn_all(self, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();

        let gc_rx = shutdown_rx.clone();
        let hub = Arc::clone(&self.hub);
        tasks.push(tokio::spawn(hub.run_gc(self.gc_interval_secs, gc_rx)));

        if let Some(relay) = self.relay {
            tasks.push(tokio::spawn(async move {
                if let Err(e) = relay.run(shutdown_rx).await {
                    tracing::error!(error = %e, "Realtime relay stopped");
                }
            }));
        }

        tasks
    }
}

#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
    pub health_service: HealthService,
    pub hub: Arc<TopicHub>,
    pub workers: Workers,
}

/// Wires repositories, services and the realtime capability together.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    pool: Option<DbPool>,
    shutdown_rx: Option<watch::Receiver<bool>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, pool: None, shutdown_rx: None }
    }

    #[must_use]
    pub fn with_database(mut self, pool: DbPool) -> Self {
        self.pool = Some(pool);
        self
    }

    #[must_use]
    pub fn with_shutdown_rx(mut self, shutdown_rx: watch::Receiver<bool>) -> Self {
        self.shutdown_rx = Some(shutdown_rx);
        self
    }

    /// Builds the application.
    ///
    /// A realtime backend that cannot be reached at boot leaves realtime disabled rather than failing.
    ///
    /// # Errors
    /// Returns an error if the database pool or shutdown receiver was not provided.
    pub async fn build(self) -> anyhow::Result<App> {
        let pool = self.pool.ok_or_else(|| anyhow::anyhow!("Database pool is required"))?;
        let shutdown_rx = self.shutdown_rx.ok_or_else(|| anyhow::anyhow!("Shutdown receiver is required"))?;
        let config = self.config;

        let hub = Arc::new(TopicHub::new(config.realtime.channel_capacity));
        let (realtime, relay) = Self::build_realtime(&config, &hub, shutdown_rx).await;

        let conversation_service = ConversationService::new(pool.clone(), ConversationRepository::new());
        let identity_service =
            IdentityService::new(pool.clone(), UserRepository::new(), config.auth.jwt_secret.clone());
        let message_service = MessageService::new(
            pool.clone(),
            MessageRepository::new(),
            conversation_service.clone(),
            ContextService::new(ReservationRepository::new()),
            NotificationService::new(NotificationRepository::new()),
            realtime.clone(),
        );
        let gateway_service = GatewayService::new(Arc::clone(&hub), conversation_service);
        let health_service = HealthService::new(pool, realtime, config.health.clone());

        Ok(App {
            services: ServiceContainer { identity_service, message_service, gateway_service },
            health_service,
            hub: Arc::clone(&hub),
            workers: Workers { hub, gc_interval_secs: config.realtime.gc_interval_secs, relay },
        })
    }

    async fn build_realtime(
        config: &Config,
        hub: &Arc<TopicHub>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> (Realtime, Option<RedisRelay>) {
        let publish_timeout = Duration::from_millis(config.realtime.publish_timeout_ms);

        match config.realtime.backend {
            RealtimeBackend::None => {
                tracing::info!("Realtime disabled by configuration");
                (Realtime::Disabled, None)
            }
            RealtimeBackend::Local => {
                tracing::info!("Realtime using in-process hub");
                let local = Arc::clone(hub);
                let transport: Arc<dyn RealtimeTransport> = local;
                (Realtime::enabled(transport, publish_timeout), None)
            }
            RealtimeBackend::Redis => {
                let Some(url) = config.realtime.redis_url.as_deref() else {
                    tracing::warn!("Redis realtime backend selected without a URL, realtime disabled");
                    return (Realtime::Disabled, None);
                };

                match RedisClient::new(url, &config.realtime, shutdown_rx).await {
                    Ok(client) => {
                        tracing::info!("Realtime using redis pub/sub");
                        let repo = RedisRealtimeRepository::new(client, config.realtime.channel_prefix.clone());
                        let relay = RedisRelay::new(repo.clone(), Arc::clone(hub));
                        (Realtime::enabled(Arc::new(repo), publish_timeout), Some(relay))
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to connect realtime transport, realtime disabled");
                        (Realtime::Disabled, None)
                    }
                }
            }
        }
    }
}
