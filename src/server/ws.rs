//! WebSocket endpoint: forwards every broadcast message to connected
//! clients and tracks presence from `user-login` hellos.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::sync::event::ServerMessage;

use super::state::ServerState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: ServerState) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    let mut event_rx = state.broadcaster.subscribe();

    log::info!("WebSocket client connected ({connection_id})");

    // Forward broadcast messages to this client
    let send_task = tokio::spawn(async move {
        while let Ok(message) = event_rx.recv().await {
            match serde_json::to_string(&message) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("Failed to serialize event: {e}");
                }
            }
        }
    });

    // Handle incoming frames until the client goes away
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(ServerMessage::UserLogin(user)) => {
                    log::info!("User logged in: {}", user.username);
                    state
                        .connected
                        .lock()
                        .unwrap()
                        .insert(connection_id, user.clone());
                    state.broadcaster.broadcast(ServerMessage::UserJoined(user));
                }
                Ok(_) => {
                    // clients only originate hellos; ignore the rest
                }
                Err(e) => {
                    log::debug!("Unparseable client frame: {e}");
                }
            },
            Ok(Message::Close(_)) => {
                log::info!("WebSocket client disconnected ({connection_id})");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("WebSocket error: {e}");
                break;
            }
        }
    }

    // Clean up presence and tell the others
    send_task.abort();
    let user = state.connected.lock().unwrap().remove(&connection_id);
    if let Some(user) = user {
        log::info!("User left: {}", user.username);
        state.broadcaster.broadcast(ServerMessage::UserLeft(user));
    }
}
