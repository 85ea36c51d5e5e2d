//! End-to-end pipelines: emotion data → reply text → audio

use crate::cancel::CancelToken;
use crate::chat::{ChatSession, GeminiBackend};
use crate::emotion::EmotionAnalysis;
use crate::prompt::PromptBuilder;
use crate::voice::{
    AudioSink, NeuphonicBackend, PlaybackReport, ScopedAudioSink, SpeechBridge, TtsConfig,
    open_playback_sink,
};
use crate::{Config, Result};

/// Open a chat session on the configured backend
///
/// # Errors
///
/// Returns `Error::Authentication` if the chat credential is missing
pub fn open_chat_session(config: &Config) -> Result<ChatSession> {
    let backend = GeminiBackend::with_base_url(config.chat_api_key()?, &config.chat.base_url)?;
    Ok(ChatSession::open(backend, &config.chat.model).with_timeout(config.chat.timeout))
}

/// Build a speech bridge on the configured TTS backend
///
/// # Errors
///
/// Returns `Error::Authentication` if the TTS credential is missing
pub fn speech_bridge(config: &Config) -> Result<SpeechBridge> {
    let backend = NeuphonicBackend::with_base_url(config.tts_api_key()?, &config.tts.base_url)?;
    Ok(SpeechBridge::new(backend).with_limits(config.tts.limits))
}

/// Render `analysis` and ask the session for a reply
///
/// # Errors
///
/// Returns `Error::Validation` for an incomplete analysis, otherwise any
/// error from [`ChatSession::send`]
pub async fn respond(
    builder: &PromptBuilder,
    session: &mut ChatSession,
    analysis: &EmotionAnalysis,
    cancel: &CancelToken,
) -> Result<String> {
    let prompt = builder.prompt_for(analysis)?;
    tracing::debug!(prompt_len = prompt.len(), "sending prompt");
    session.send(&prompt, cancel).await
}

/// Stream `text` into `sink`, then release it
///
/// The sink is released on every path; on success flush errors are reported.
///
/// # Errors
///
/// Any error from [`SpeechBridge::stream_and_play`] or from releasing the sink
pub async fn speak_into<S: AudioSink>(
    bridge: &SpeechBridge,
    mut sink: ScopedAudioSink<S>,
    text: &str,
    tts: &TtsConfig,
    cancel: &CancelToken,
) -> Result<PlaybackReport> {
    let report = bridge.stream_and_play(&mut sink, text, tts, cancel).await?;
    sink.finish()?;
    Ok(report)
}

/// Component 1: produce the therapist reply for `analysis`
///
/// # Errors
///
/// Returns `Error::Authentication` before any network call if the chat
/// credential is missing, otherwise any error from [`respond`]
pub async fn reply(
    config: &Config,
    analysis: &EmotionAnalysis,
    cancel: &CancelToken,
) -> Result<String> {
    let mut session = open_chat_session(config)?;
    let outcome = respond(&config.prompt_builder(), &mut session, analysis, cancel).await;
    session.close();
    outcome
}

/// Component 2: speak `text` on the default output device
///
/// # Errors
///
/// Returns `Error::Authentication` before any network call if the TTS
/// credential is missing, otherwise any error from [`speak_into`]
#[allow(clippy::future_not_send)]
pub async fn speak(config: &Config, text: &str, cancel: &CancelToken) -> Result<PlaybackReport> {
    let bridge = speech_bridge(config)?;
    let tts = config.tts_config()?;
    let sink = open_playback_sink(config.tts.sampling_rate)?;
    speak_into(&bridge, sink, text, &tts, cancel).await
}
