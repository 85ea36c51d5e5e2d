//! Companion HTTP server
//!
//! Serves synthesized speech as WAV over HTTP and a lightweight therapist
//! responder over WebSocket, for browser front ends.

pub mod health;
pub mod tts;
pub mod websocket;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cancel::CancelToken;
use crate::voice::{SpeechBridge, TtsConfig};
use crate::{Config, Result};

/// TTS bridge and settings used by the `/tts` endpoint
pub struct SpeechService {
    pub bridge: SpeechBridge,
    pub tts: TtsConfig,
}

/// Shared state for API handlers
pub struct ApiState {
    /// `None` when TTS is not configured; `/tts` then answers 500
    pub speech: Option<SpeechService>,
    pub cancel: CancelToken,
}

impl ApiState {
    /// Build state from configuration, leaving TTS disabled if unusable
    #[must_use]
    pub fn from_config(config: &Config, cancel: CancelToken) -> Self {
        let speech = match (crate::pipeline::speech_bridge(config), config.tts_config()) {
            (Ok(bridge), Ok(tts)) => Some(SpeechService { bridge, tts }),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "TTS unavailable; /tts will fail");
                None
            }
        };
        Self { speech, cancel }
    }
}

/// Build the API router
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::router())
        .route("/tts", get(tts::synthesize))
        .route("/ws", get(websocket::ws_upgrade))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the server until `state.cancel` fires
///
/// # Errors
///
/// Returns error if the server fails to bind or run
pub async fn serve(state: ApiState, port: u16) -> Result<()> {
    let cancel = state.cancel.clone();
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

    tracing::info!(port, "API server listening");

    axum::serve(listener, router(Arc::new(state)))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

    tracing::info!("API server stopped");
    Ok(())
}
