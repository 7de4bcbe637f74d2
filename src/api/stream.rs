//! WebSocket event feed.
//!
//! One persistent connection per client: a `connected` greeting on
//! upgrade, then every published [`DashboardEvent`] as a JSON frame
//! until the client disconnects. Delivery is best-effort — clients
//! that lag behind the broadcast buffer skip the missed events.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::routes::AppState;
use crate::events::DashboardEvent;

pub async fn events_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_event_stream(socket, state))
}

async fn handle_event_stream(socket: WebSocket, state: Arc<AppState>) {
    tracing::info!("Dashboard event stream client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Greeting first, so clients can confirm the channel is live
    let greeting = DashboardEvent::Connected {
        message: "Connected to OpenClaw Dashboard".to_string(),
    };
    if let Ok(json) = serde_json::to_string(&greeting) {
        if ws_sender.send(Message::Text(json)).await.is_err() {
            tracing::debug!("Client disconnected before greeting");
            return;
        }
    }

    // Subscribe after the greeting; only events published from here on
    // are delivered.
    let mut rx = state.events.subscribe();

    // Drain incoming frames so close handshakes are honored
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    let mut stream_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(j) => j,
                        Err(_) => continue,
                    };
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        tracing::debug!("Client disconnected from event stream");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("Event stream client lagged by {} events", n);
                    // Continue receiving
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event channel closed");
                    break;
                }
            }
        }
    });

    // Whichever side finishes first tears down the other
    tokio::select! {
        _ = &mut recv_task => {
            stream_task.abort();
        }
        _ = &mut stream_task => {
            recv_task.abort();
        }
    }

    tracing::info!("Dashboard event stream client disconnected");
}
