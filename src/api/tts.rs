//! Speech synthesis endpoint

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::ApiState;
use crate::voice::{BufferSink, ScopedAudioSink, pcm_to_wav};
use crate::{Error, Result};

/// Text spoken when the request names none
pub const DEFAULT_MESSAGE: &str = "Hello World!";

#[derive(Debug, Deserialize)]
pub struct TtsQuery {
    pub msg: Option<String>,
}

/// `GET /tts?msg=...` → WAV audio
pub async fn synthesize(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<TtsQuery>,
) -> Response {
    let msg = query
        .msg
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());

    match render_wav(&state, &msg).await {
        Ok(wav) => ([(header::CONTENT_TYPE, "audio/wav")], wav).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "TTS request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error processing TTS request",
            )
                .into_response()
        }
    }
}

async fn render_wav(state: &ApiState, msg: &str) -> Result<Vec<u8>> {
    let speech = state
        .speech
        .as_ref()
        .ok_or_else(|| Error::Authentication("TTS backend not configured".to_string()))?;

    let rate = speech.tts.sampling_rate();
    let mut sink = ScopedAudioSink::new(BufferSink::new(rate));
    let report = speech
        .bridge
        .stream_and_play(&mut sink, msg, &speech.tts, &state.cancel)
        .await?;

    let wav = pcm_to_wav(sink.get_ref().pcm(), rate)?;
    sink.finish()?;

    tracing::debug!(chunks = report.chunks, wav_bytes = wav.len(), "served TTS audio");
    Ok(wav)
}
