//! WebSocket responder for transcript and emotion updates

use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::ApiState;

/// Incoming WebSocket message from client
#[derive(Debug, Deserialize)]
pub struct WsIncoming {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Outgoing WebSocket message to client
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsOutgoing {
    Response(String),
}

/// Acknowledgement for a reported feeling
#[must_use]
pub fn acknowledge(feeling: &str) -> String {
    format!("Therapist: I understand you are feeling {feeling}. Tell me more about that.")
}

/// Handle WebSocket upgrade request
pub async fn ws_upgrade(
    State(_state): State<Arc<ApiState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(handle_socket)
}

/// Handle WebSocket connection
async fn handle_socket(mut socket: WebSocket) {
    tracing::info!("WebSocket client connected");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let Some(reply) = handle_message(text.as_str()) else {
                    continue;
                };
                if socket.send(Message::Text(reply.into())).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    tracing::info!("WebSocket client disconnected");
}

/// Reply for one incoming text frame, if it warrants one
#[must_use]
pub fn handle_message(text: &str) -> Option<String> {
    let incoming: WsIncoming = match serde_json::from_str(text) {
        Ok(incoming) => incoming,
        Err(e) => {
            tracing::warn!(error = %e, "malformed websocket message");
            return None;
        }
    };

    tracing::debug!(kind = %incoming.kind, "received websocket message");

    if incoming.kind != "transcript" && incoming.kind != "emotion" {
        return None;
    }

    let feeling = match incoming.data {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };

    serde_json::to_string(&WsOutgoing::Response(acknowledge(&feeling))).ok()
}
