//! Text-to-speech (TTS) configuration and streaming backend

use std::collections::VecDeque;

use async_trait::async_trait;
use base64::Engine;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::sink::AudioChunk;
use super::sse::SseDecoder;
use crate::{Error, Result};

/// Default Neuphonic API endpoint
pub const DEFAULT_NEUPHONIC_URL: &str = "https://api.neuphonic.com";

/// Language codes the TTS backend can speak
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "es", "de", "nl", "ar", "fr", "pt", "ru", "hi", "zh", "ja", "ko",
];

/// Immutable synthesis settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TtsConfig {
    lang_code: String,
    sampling_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f32>,
}

impl TtsConfig {
    /// Build a configuration for `lang_code` at `sampling_rate` Hz
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the rate is zero or the language is not
    /// supported by the backend
    pub fn configure(lang_code: &str, sampling_rate: u32) -> Result<Self> {
        if sampling_rate == 0 {
            return Err(Error::Validation(
                "TTS sampling rate must be positive".to_string(),
            ));
        }

        let lang_code = lang_code.trim().to_ascii_lowercase();
        if !SUPPORTED_LANGUAGES.contains(&lang_code.as_str()) {
            return Err(Error::Validation(format!(
                "unsupported TTS language code: {lang_code:?}"
            )));
        }

        Ok(Self {
            lang_code,
            sampling_rate,
            voice_id: None,
            speed: None,
        })
    }

    /// Use a specific voice
    #[must_use]
    pub fn with_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }

    /// Set the speech rate multiplier
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` unless `speed` is in (0, 2]
    pub fn with_speed(mut self, speed: f32) -> Result<Self> {
        if !speed.is_finite() || speed <= 0.0 || speed > 2.0 {
            return Err(Error::Validation(format!(
                "TTS speed must be in (0, 2], got {speed}"
            )));
        }
        self.speed = Some(speed);
        Ok(self)
    }

    #[must_use]
    pub fn lang_code(&self) -> &str {
        &self.lang_code
    }

    #[must_use]
    pub const fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    #[must_use]
    pub fn voice_id(&self) -> Option<&str> {
        self.voice_id.as_deref()
    }

    #[must_use]
    pub const fn speed(&self) -> Option<f32> {
        self.speed
    }
}

/// Ordered audio chunks from a synthesis stream
pub type AudioStream = BoxStream<'static, Result<AudioChunk>>;

/// A hosted streaming TTS service
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Start synthesizing `text`; chunks arrive in playback order
    async fn open_stream(&self, text: &str, config: &TtsConfig) -> Result<AudioStream>;
}

/// Neuphonic SSE request body
#[derive(Debug, Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
    encoding: &'static str,
    #[serde(flatten)]
    config: &'a TtsConfig,
}

/// One Neuphonic SSE event
#[derive(Debug, Deserialize)]
struct SpeakEvent {
    #[serde(default = "ok_status")]
    status_code: u16,
    data: Option<SpeakEventData>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SpeakEventData {
    audio: Option<String>,
}

const fn ok_status() -> u16 {
    200
}

/// Neuphonic streaming TTS over server-sent events
pub struct NeuphonicBackend {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl NeuphonicBackend {
    /// Create a backend for the public Neuphonic endpoint
    ///
    /// # Errors
    ///
    /// Returns `Error::Authentication` if the API key is empty
    pub fn new(api_key: SecretString) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_NEUPHONIC_URL)
    }

    /// Create a backend for a custom endpoint
    ///
    /// # Errors
    ///
    /// Returns `Error::Authentication` if the API key is empty
    pub fn with_base_url(api_key: SecretString, base_url: impl Into<String>) -> Result<Self> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(Error::Authentication(
                "Neuphonic API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SpeechBackend for NeuphonicBackend {
    async fn open_stream(&self, text: &str, config: &TtsConfig) -> Result<AudioStream> {
        let url = format!("{}/sse/speak/{}", self.base_url, config.lang_code());
        let request = SpeakRequest {
            text,
            encoding: "pcm_linear",
            config,
        };

        tracing::debug!(
            lang = config.lang_code(),
            sampling_rate = config.sampling_rate(),
            text_len = text.len(),
            "starting TTS stream"
        );

        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication(format!(
                "Neuphonic rejected credential ({status})"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport(format!("Neuphonic TTS error {status}: {body}")));
        }

        Ok(audio_chunks(response.bytes_stream()))
    }
}

/// Turn an SSE body into audio chunks, decoding events as bytes arrive
///
/// The stream ends after the first error.
pub fn audio_chunks<S, B, E>(body: S) -> AudioStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = StreamState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                if item.is_err() {
                    state.ready.clear();
                    state.finished = true;
                }
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    for payload in state.decoder.feed(bytes.as_ref()) {
                        state.push_event(&payload);
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state
                        .ready
                        .push_back(Err(Error::Transport(format!("TTS stream interrupted: {e}"))));
                }
                None => {
                    state.finished = true;
                    if let Some(payload) = state.decoder.finish() {
                        state.push_event(&payload);
                    }
                }
            }
        }
    })
    .boxed()
}

struct StreamState<S> {
    body: std::pin::Pin<Box<S>>,
    decoder: SseDecoder,
    ready: VecDeque<Result<AudioChunk>>,
    finished: bool,
}

impl<S> StreamState<S> {
    fn push_event(&mut self, payload: &str) {
        match parse_event(payload) {
            Ok(Some(chunk)) => self.ready.push_back(Ok(chunk)),
            Ok(None) => {}
            Err(e) => self.ready.push_back(Err(e)),
        }
    }
}

/// Decode one event payload into audio, if it carries any
fn parse_event(payload: &str) -> Result<Option<AudioChunk>> {
    let event: SpeakEvent = serde_json::from_str(payload)
        .map_err(|e| Error::Transport(format!("malformed TTS event: {e}")))?;

    if event.status_code != 200 {
        let detail = event.errors.map(|e| e.to_string()).unwrap_or_default();
        return Err(Error::Transport(format!(
            "TTS stream reported status {}: {detail}",
            event.status_code
        )));
    }

    let Some(audio) = event.data.and_then(|d| d.audio).filter(|a| !a.is_empty()) else {
        return Ok(None);
    };

    let pcm = base64::engine::general_purpose::STANDARD
        .decode(audio)
        .map_err(|e| Error::Transport(format!("malformed TTS audio payload: {e}")))?;
    Ok(Some(AudioChunk::new(pcm)))
}
