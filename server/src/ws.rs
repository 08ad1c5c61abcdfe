use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use sketchparty_protocol::{ClientToServer, ServerToClient};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::SharedEngine;
use crate::outbox::short;

#[derive(Debug, Clone, Copy)]
pub struct Keepalive {
    pub interval: Duration,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: SharedEngine,
    pub keepalive: Keepalive,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (tx_out, mut rx_out) = mpsc::unbounded_channel::<ServerToClient>();
    let keepalive = state.keepalive;

    let mut writer = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(keepalive.interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                msg = rx_out.recv() => {
                    let Some(msg) = msg else { break };
                    let text = match serde_json::to_string(&msg) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("[WS] could not encode {:?}: {}", msg, e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let conn = Uuid::new_v4();
    state.engine.lock().on_connect(conn, tx_out.clone());

    // Any inbound frame, pongs included, counts as liveness.
    let idle_limit = keepalive.interval + keepalive.timeout;
    loop {
        let msg = tokio::select! {
            next = tokio::time::timeout(idle_limit, receiver.next()) => match next {
                Ok(Some(Ok(msg))) => msg,
                Ok(_) => break,
                Err(_) => {
                    info!("[WS] {} silent for {:?}, dropping", short(conn), idle_limit);
                    break;
                }
            },
            _ = &mut writer => break,
        };

        match msg {
            Message::Text(t) => match serde_json::from_str::<ClientToServer>(&t) {
                Ok(cmd) => {
                    state.engine.lock().on_event(conn, cmd);
                }
                Err(e) => {
                    debug!("[WS] bad json from {}: {}", short(conn), e);
                    let _ = tx_out.send(ServerToClient::Error("bad json".into()));
                }
            },
            Message::Binary(blob) => {
                state.engine.lock().submit_drawing(conn, blob);
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    state.engine.lock().on_disconnect(conn);
    writer.abort();
}
