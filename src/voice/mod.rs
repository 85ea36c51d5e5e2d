//! Voice output
//!
//! Streaming TTS, scoped playback sinks, and the bridge between them.

mod bridge;
mod playback;
mod sink;
mod sse;
mod tts;
mod wav;

pub use bridge::{
    DEFAULT_CHUNK_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, PlaybackReport, SpeechBridge, StreamLimits,
};
pub use playback::{CpalSink, open_playback_sink};
pub use sink::{AudioChunk, AudioSink, BufferSink, PcmDecoder, ScopedAudioSink};
pub use sse::SseDecoder;
pub use tts::{
    AudioStream, DEFAULT_NEUPHONIC_URL, NeuphonicBackend, SUPPORTED_LANGUAGES, SpeechBackend,
    TtsConfig, audio_chunks,
};
pub use wav::pcm_to_wav;
