use crate::services::gateway::Metrics;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt, stream::select_all};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use uuid::Uuid;

pub(crate) struct Session {
    pub(crate) user_id: Uuid,
    pub(crate) request_id: String,
    pub(crate) socket: WebSocket,
    pub(crate) receivers: Vec<broadcast::Receiver<Arc<str>>>,
    pub(crate) metrics: Metrics,
    pub(crate) shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl Session {
    #[tracing::instrument(
        name = "websocket_session",
        skip(self),
        fields(
            user_id = %self.user_id,
            request_id = %self.request_id,
            otel.kind = "server",
            ws.session_id = %Uuid::new_v4()
        )
    )]
    pub(crate) async fn run(self) {
        let Self { socket, receivers, metrics, mut shutdown_rx, .. } = self;

        metrics.active_connections.add(1, &[]);
        tracing::info!(topics = receivers.len(), "WebSocket connected");

        let (mut ws_sink, mut ws_stream) = socket.split();
        let mut events = select_all(receivers.into_iter().map(BroadcastStream::new));

        loop {
            if *shutdown_rx.borrow() {
                tracing::info!("Shutdown signal received, closing WebSocket");
                let _ = ws_sink
                    .send(WsMessage::Close(Some(axum::extract::ws::CloseFrame {
                        code: axum::extract::ws::close_code::AWAY,
                        reason: "Server shutting down".into(),
                    })))
                    .await;
                break;
            }

            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {}

                msg = ws_stream.next() => {
                    match msg {
                        Some(Ok(WsMessage::Close(_)) | Err(_)) | None => break,
                        Some(Ok(WsMessage::Text(t))) => {
                            tracing::debug!(len = t.len(), "Ignoring inbound text frame");
                        }
                        Some(Ok(WsMessage::Binary(_))) => {
                            tracing::debug!("Ignoring inbound binary frame");
                        }
                        Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {}
                    }
                }

                event = events.next() => {
                    match event {
                        Some(Ok(frame)) => {
                            if ws_sink.send(WsMessage::Text(frame.as_ref().into())).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(BroadcastStreamRecvError::Lagged(n))) => {
                            tracing::warn!(missed = n, "Realtime subscriber lagged");
                            metrics.lagged_total.add(n, &[]);
                        }
                        None => break,
                    }
                }
            }
        }

        let _ = ws_sink.close().await;

        metrics.active_connections.add(-1, &[]);
        tracing::info!("WebSocket disconnected");
    }
}
