//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{ConnectionId, RoomCommand, RoomHandle};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::ClientMsg;

/// WebSocket upgrade handler; the path segment is the opaque room code
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_code): Path<String>,
    State(state): State<AppState>,
) -> Response {
    info!(room = %room_code, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, room_code, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, room_code: String, state: AppState) {
    let conn_id = ConnectionId::new();
    info!(room = %room_code, conn_id = %conn_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<String>(state.config.room.connection_buffer);

    let room = match state.rooms.attach(&room_code, conn_id, outbound_tx).await {
        Ok(room) => room,
        Err(e) => {
            error!(room = %room_code, conn_id = %conn_id, error = %e, "Failed to attach to room");
            return;
        }
    };

    // Writer task: room broadcasts -> WebSocket
    let writer_handle = tokio::spawn(write_loop(conn_id, ws_sink, outbound_rx));

    // Reader loop: WebSocket -> room
    let limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);
    read_loop(conn_id, &room, ws_stream, limiter).await;

    // Detach from the room, which drops the player and reassigns host
    if !room.send(RoomCommand::Disconnect { conn_id }).await {
        debug!(room = %room_code, conn_id = %conn_id, "Room already closed on disconnect");
    }

    writer_handle.abort();

    info!(room = %room_code, conn_id = %conn_id, "WebSocket connection closed");
}

async fn write_loop(
    conn_id: ConnectionId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<String>,
) {
    while let Some(json) = outbound_rx.recv().await {
        if let Err(e) = ws_sink.send(Message::Text(json)).await {
            debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

async fn read_loop(
    conn_id: ConnectionId,
    room: &RoomHandle,
    mut ws_stream: SplitStream<WebSocket>,
    limiter: ConnectionRateLimiter,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !limiter.check_input() {
                    warn!(conn_id = %conn_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        if !room.send(RoomCommand::Message { conn_id, msg }).await {
                            debug!(conn_id = %conn_id, "Room channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(conn_id = %conn_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(conn_id = %conn_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}
