use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::api::rest::auth::Caller;
use crate::models::principal::Principal;
use crate::notify::TransitionEvent;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, principal))
}

/// Streams committed transitions. Vehicles only hear about their own packages.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, principal: Principal) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.engine.subscribe());

    info!(principal = principal.kind(), id = %principal.id(), "websocket client connected");

    let send_task = tokio::spawn(async move {
        while let Some(next) = events.next().await {
            let event = match next {
                Ok(event) => event,
                Err(err) => {
                    warn!(error = %err, "websocket subscriber lagged behind dispatch feed");
                    continue;
                }
            };

            if !visible_to(&principal, &event) {
                continue;
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize transition for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}

fn visible_to(principal: &Principal, event: &TransitionEvent) -> bool {
    principal
        .vehicle_id()
        .is_none_or(|own| own == event.vehicle_id)
}
