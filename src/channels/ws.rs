//! WebSocket session channel.
//!
//! Each connection to `/ws` gets its own [`SessionMachine`]. Inbound text
//! frames are utterances; outbound frames are JSON [`ServerFrame`]s. A turn
//! is fully processed before the next frame is read.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use super::frame::{FrameSink, ServerFrame};
use crate::dispatch::JobDispatcher;
use crate::error::ChannelError;
use crate::extraction::Extractor;
use crate::session::{SessionMachine, SessionSettings};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: SessionSettings,
    pub extractor: Arc<dyn Extractor>,
    pub dispatcher: Arc<dyn JobDispatcher>,
}

/// Build the Axum router with the session WebSocket and health routes.
pub fn session_routes(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "browser-agent",
        "variant": state.settings.variant.to_string(),
    }))
}

// ── WebSocket ───────────────────────────────────────────────────────────

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Writes frames straight to the socket.
struct SocketSink<'a> {
    socket: &'a mut WebSocket,
}

#[async_trait]
impl FrameSink for SocketSink<'_> {
    async fn send_frame(&mut self, frame: ServerFrame) -> Result<(), ChannelError> {
        let json = serde_json::to_string(&frame).map_err(|e| ChannelError::SendFailed {
            name: "ws".to_string(),
            reason: e.to_string(),
        })?;
        self.socket
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| ChannelError::Disconnected {
                name: "ws".to_string(),
                reason: e.to_string(),
            })
    }
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut machine = SessionMachine::new(
        state.settings,
        Arc::clone(&state.extractor),
        Arc::clone(&state.dispatcher),
    );
    let session_id = machine.id();
    info!(%session_id, "WebSocket session started");

    if let Err(e) = machine.greet(&mut SocketSink { socket: &mut socket }).await {
        warn!(%session_id, error = %e, "Failed to send greeting, client disconnected");
        return;
    }

    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => {
                let utterance = text.trim();
                debug!(%session_id, chars = utterance.len(), "Received utterance");
                let mut sink = SocketSink { socket: &mut socket };
                if let Err(e) = machine.handle_turn(utterance, &mut sink).await {
                    info!(%session_id, error = %e, "Session channel closed mid-turn");
                    break;
                }
            }
            Some(Ok(Message::Ping(data))) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    break;
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                info!(%session_id, "Client disconnected");
                break;
            }
            Some(Err(e)) => {
                warn!(%session_id, error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    info!(%session_id, phase = %machine.phase(), "WebSocket session closed");
}
