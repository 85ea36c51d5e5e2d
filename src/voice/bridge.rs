//! Response-to-speech streaming bridge
//!
//! Feeds a reply into a streaming TTS backend and forwards each audio chunk to
//! a playback sink as soon as it arrives.

use std::time::Duration;

use futures::StreamExt;

use super::sink::{AudioSink, ScopedAudioSink};
use super::tts::{SpeechBackend, TtsConfig};
use crate::cancel::CancelToken;
use crate::{Error, Result};

/// Default limit for establishing the TTS stream
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default limit for waiting on the next chunk
pub const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(30);

/// Time limits for one streaming call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLimits {
    /// Until the backend accepts the request
    pub connect: Duration,
    /// Between consecutive chunks
    pub chunk: Duration,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            chunk: DEFAULT_CHUNK_TIMEOUT,
        }
    }
}

/// Summary of a completed stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub chunks: usize,
    pub bytes: usize,
}

/// Streams text through a TTS backend into a sink
pub struct SpeechBridge {
    backend: Box<dyn SpeechBackend>,
    limits: StreamLimits,
}

impl SpeechBridge {
    pub fn new(backend: impl SpeechBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            limits: StreamLimits::default(),
        }
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: StreamLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub const fn limits(&self) -> StreamLimits {
        self.limits
    }

    /// Synthesize `text` and play it chunk by chunk
    ///
    /// The sink's rate must equal the configured rate; this is checked before
    /// the backend is contacted. Chunks are played in arrival order. The sink
    /// is not released here: the caller's scoped guard does that on every path.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigMismatch` for differing rates, `Error::Validation`
    /// for empty text, `Error::Transport` if the stream fails or stalls,
    /// `Error::Cancelled` if `cancel` fires, or any sink error
    pub async fn stream_and_play<S: AudioSink>(
        &self,
        sink: &mut ScopedAudioSink<S>,
        text: &str,
        config: &TtsConfig,
        cancel: &CancelToken,
    ) -> Result<PlaybackReport> {
        if sink.sample_rate() != config.sampling_rate() {
            return Err(Error::ConfigMismatch {
                sink: sink.sample_rate(),
                config: config.sampling_rate(),
            });
        }
        if text.trim().is_empty() {
            return Err(Error::Validation("nothing to speak".to_string()));
        }

        let mut stream = cancel
            .bounded(
                "TTS stream setup",
                self.limits.connect,
                self.backend.open_stream(text, config),
            )
            .await?;

        let mut report = PlaybackReport::default();
        loop {
            let next = cancel
                .bounded("TTS chunk", self.limits.chunk, async { Ok(stream.next().await) })
                .await?;

            match next {
                Some(Ok(chunk)) => {
                    sink.play(&chunk)?;
                    report.chunks += 1;
                    report.bytes += chunk.len();
                    tracing::trace!(index = report.chunks, bytes = chunk.len(), "played chunk");
                }
                Some(Err(e)) => {
                    tracing::warn!(played = report.chunks, error = %e, "TTS stream failed");
                    return Err(e);
                }
                None => break,
            }
        }

        tracing::debug!(chunks = report.chunks, bytes = report.bytes, "TTS stream drained");
        Ok(report)
    }
}
