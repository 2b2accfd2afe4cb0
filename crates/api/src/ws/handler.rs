use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use railwatch_sync::{DashboardSession, DashboardUpdate};
use serde_json::json;

use crate::state::AppState;
use crate::ws::manager::WsSender;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// Each connection gets its own [`DashboardSession`]; its updates and the
/// pipeline notifications broadcast by the manager share one outbound
/// channel.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// 1. Registers the connection with `WsManager`.
/// 2. Opens a dashboard session and forwards its updates as JSON text.
/// 3. Spawns a sender task that drains the outbound channel into the sink.
/// 4. Processes inbound frames until the client goes away, then closes the
///    session so no update is delivered afterwards.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let (tx, mut rx) = state.ws_manager.add(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    let session = match DashboardSession::open(state.store.as_ref(), &state.sync_config).await {
        Ok((session, mut updates)) => {
            let updates_tx = tx.clone();
            let forward_task = tokio::spawn(async move {
                while let Some(update) = updates.recv().await {
                    if !send_update(&updates_tx, &update) {
                        break;
                    }
                }
            });
            Some((session, forward_task))
        }
        Err(e) => {
            tracing::warn!(conn_id = %conn_id, error = %e, "Failed to open dashboard session");
            let body = json!({ "kind": "error", "error": e.to_string() });
            let _ = tx.send(Message::Text(body.to_string().into()));
            None
        }
    };

    // Receiver loop: the dashboard protocol is push-only.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    if let Some((session, forward_task)) = session {
        session.close();
        forward_task.abort();
    }
    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Serialize an update onto the connection channel. Returns `false` once
/// the connection is gone.
fn send_update(tx: &WsSender, update: &DashboardUpdate) -> bool {
    match serde_json::to_string(update) {
        Ok(text) => tx.send(Message::Text(text.into())).is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize dashboard update");
            true
        }
    }
}
