#![allow(
    dead_code,
    unreachable_pub,
    missing_debug_implementations,
    clippy::unwrap_used,
    clippy::panic,
    clippy::print_stderr,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
use clap::Parser;
use futures::StreamExt;
use marketplace_messaging::adapters::database::DbPool;
use marketplace_messaging::api::{MgmtState, app_router, mgmt_router};
use marketplace_messaging::config::{Config, RealtimeBackend};
use marketplace_messaging::domain::auth::Claims;
use marketplace_messaging::services::message_service::MessageService;
use marketplace_messaging::services::realtime::TopicHub;
use marketplace_messaging::{AppBuilder, adapters};
use redis::AsyncCommands;
use serde_json::Value;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret";

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("marketplace_messaging=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap())
            .add_directive("tungstenite=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
    });
}

/// Test configuration, or `None` when no database is available.
pub fn get_test_config() -> Option<Config> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping integration test");
        return None;
    };

    Some(
        Config::try_parse_from([
            "marketplace-messaging",
            "--database-url",
            &database_url,
            "--jwt-secret",
            JWT_SECRET,
            "--host",
            "127.0.0.1",
            "--db-max-connections",
            "10",
            "--realtime-backend",
            "local",
        ])
        .unwrap(),
    )
}

/// Test configuration sharing a Redis bus under a fresh channel prefix, or `None` when
/// Postgres or Redis is unavailable.
pub fn get_redis_test_config() -> Option<Config> {
    let mut config = get_test_config()?;
    let Ok(redis_url) = std::env::var("REDIS_URL") else {
        eprintln!("REDIS_URL not set, skipping multi-node test");
        return None;
    };

    config.realtime.backend = RealtimeBackend::Redis;
    config.realtime.redis_url = Some(redis_url);
    config.realtime.channel_prefix = format!("test-{}:", Uuid::new_v4().simple());
    Some(config)
}

pub struct TestApp {
    pub config: Config,
    pub pool: DbPool,
    pub hub: Arc<TopicHub>,
    pub message_service: MessageService,
    pub server_url: String,
    pub ws_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub shutdown_tx: watch::Sender<bool>,
}

impl TestApp {
    pub async fn spawn() -> Option<Self> {
        Some(Self::spawn_with_config(get_test_config()?).await)
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        setup_tracing();

        let pool = adapters::database::init_pool(&config.database)
            .await
            .expect("Failed to connect to DB. Is Postgres running?");
        marketplace_messaging::run_migrations(&pool).await.expect("Failed to run migrations");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let app = AppBuilder::new(config.clone())
            .with_database(pool.clone())
            .with_shutdown_rx(shutdown_rx.clone())
            .build()
            .await
            .unwrap();

        let hub = Arc::clone(&app.hub);
        let message_service = app.services.message_service.clone();
        let _workers = app.workers.spawn_all(shutdown_rx.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mgmt_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_addr = mgmt_listener.local_addr().unwrap();

        let router = app_router(config.clone(), app.services, shutdown_rx.clone());
        let mgmt = mgmt_router(MgmtState { health_service: app.health_service });

        let mut api_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = api_rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        let mut mgmt_rx = shutdown_rx;
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt)
                .with_graceful_shutdown(async move {
                    let _ = mgmt_rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        Self {
            config,
            pool,
            hub,
            message_service,
            server_url: format!("http://{addr}"),
            ws_url: format!("ws://{addr}"),
            mgmt_url: format!("http://{mgmt_addr}"),
            client: reqwest::Client::new(),
            shutdown_tx,
        }
    }

    pub async fn create_user(&self, name: &str) -> TestUser {
        self.create_user_with_image(name, None).await
    }

    pub async fn create_user_with_image(&self, name: &str, image: Option<&str>) -> TestUser {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, name, image) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(name)
            .bind(image)
            .execute(&self.pool)
            .await
            .unwrap();

        let token = Claims::new(id, 3600).encode(JWT_SECRET).unwrap();
        TestUser { id, name: name.to_string(), token }
    }

    /// Creates a listing with `title` and a reservation on it.
    pub async fn create_reservation(&self, title: Option<&str>) -> Uuid {
        let listing_id = Uuid::new_v4();
        sqlx::query("INSERT INTO listings (id, title) VALUES ($1, $2)")
            .bind(listing_id)
            .bind(title)
            .execute(&self.pool)
            .await
            .unwrap();

        let reservation_id = Uuid::new_v4();
        sqlx::query("INSERT INTO reservations (id, listing_id) VALUES ($1, $2)")
            .bind(reservation_id)
            .bind(listing_id)
            .execute(&self.pool)
            .await
            .unwrap();

        reservation_id
    }

    /// Inserts a conversation row directly, bypassing pair canonicalization.
    pub async fn create_raw_conversation(&self, participants: &[Uuid]) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO conversations (id, participant_ids) VALUES ($1, $2)")
            .bind(id)
            .bind(participants.to_vec())
            .execute(&self.pool)
            .await
            .unwrap();
        id
    }

    pub async fn send_message(&self, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/v1/messages", self.server_url))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Sends and asserts success, returning the message body.
    pub async fn send_ok(&self, token: &str, body: &Value) -> Value {
        let resp = self.send_message(token, body).await;
        assert_eq!(resp.status(), 200, "send failed");
        resp.json().await.unwrap()
    }

    pub async fn list_messages(&self, token: &str, query: &[(&str, String)]) -> reqwest::Response {
        let url = reqwest::Url::parse_with_params(&format!("{}/v1/messages", self.server_url), query).unwrap();
        self.client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    pub async fn count(&self, sql: &str, id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>(sql).bind(id).fetch_one(&self.pool).await.unwrap()
    }

    pub async fn conversation_count_for(&self, user_id: Uuid) -> i64 {
        self.count("SELECT COUNT(*) FROM conversations WHERE $1 = ANY(participant_ids)", user_id).await
    }

    pub async fn notification_count_for(&self, user_id: Uuid) -> i64 {
        self.count("SELECT COUNT(*) FROM notifications WHERE user_id = $1", user_id).await
    }

    pub async fn connect_ws(&self, token: &str, conversation_id: Option<Uuid>) -> TestClient {
        let mut url = format!("{}/v1/gateway?token={token}", self.ws_url);
        if let Some(id) = conversation_id {
            url.push_str(&format!("&conversationId={id}"));
        }
        let (ws, _) = tokio_tungstenite::connect_async(url).await.expect("Failed to connect WebSocket");
        TestClient { ws }
    }

    /// Waits until this node's relay is forwarding from the Redis bus.
    pub async fn wait_for_relay(&self) {
        let url = self.config.realtime.redis_url.as_deref().expect("Redis URL not configured");
        let mut conn = redis::Client::open(url).unwrap().get_connection_manager().await.unwrap();

        let topic = format!("user-{}", Uuid::new_v4());
        let channel = format!("{}{topic}", self.config.realtime.channel_prefix);
        let mut rx = self.hub.subscribe(&topic);

        for _ in 0..100 {
            conn.publish::<_, _, i64>(&channel, "{}").await.unwrap();
            if tokio::time::timeout(Duration::from_millis(50), rx.recv()).await.is_ok() {
                return;
            }
        }
        panic!("Timed out waiting for the realtime relay");
    }

    /// Waits until `topic` has at least `count` local subscribers.
    pub async fn wait_for_subscribers(&self, topic: &str, count: usize) {
        for _ in 0..100 {
            if self.hub.subscriber_count(topic) >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Timed out waiting for subscribers on {topic}");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub token: String,
}

pub struct TestClient {
    pub ws: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
}

impl TestClient {
    /// Next JSON envelope, skipping control frames.
    pub async fn receive_event(&mut self) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let msg = tokio::time::timeout_at(deadline, self.ws.next()).await.ok()??.ok()?;
            if let WsMessage::Text(text) = msg {
                let value: Value = serde_json::from_str(&text).ok()?;
                if value.get("event").is_some() {
                    return Some(value);
                }
            }
        }
    }
}

/// Receives the next envelope from a hub subscription.
pub async fn next_event(rx: &mut broadcast::Receiver<Arc<str>>) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timed out waiting for realtime event")
        .unwrap();
    serde_json::from_str(&frame).unwrap()
}
