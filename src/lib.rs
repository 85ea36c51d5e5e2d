//! Solace - emotion-aware therapist replies, spoken aloud
//!
//! This library provides the two stages of the Solace pipeline:
//! - Prompt building: render an emotion analysis into a persona-conditioned
//!   prompt and obtain a reply from a hosted chat model
//! - Speech bridging: stream the reply through a hosted TTS service and play
//!   audio chunks as they arrive
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌───────────────┐   ┌──────────────┐   ┌──────────┐
//! │ EmotionAnalysis  │──▶│ PromptBuilder │──▶│ ChatSession  │──▶│  reply   │
//! └──────────────────┘   └───────────────┘   └──────────────┘   └────┬─────┘
//!                                                                    │
//!                     ┌──────────────┐   ┌──────────────────┐        │
//!                     │  AudioSink   │◀──│  SpeechBridge    │◀───────┘
//!                     └──────────────┘   └──────────────────┘
//! ```

pub mod api;
pub mod cancel;
pub mod chat;
pub mod config;
pub mod emotion;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod voice;

pub use cancel::CancelToken;
pub use chat::{ChatBackend, ChatSession, GeminiBackend};
pub use config::Config;
pub use emotion::{EmotionAnalysis, EmotionSample};
pub use error::{Error, Result};
pub use prompt::{ChatMessage, PromptBuilder, PromptTemplates, Role, render};
pub use voice::{
    AudioChunk, AudioSink, NeuphonicBackend, PlaybackReport, ScopedAudioSink, SpeechBackend,
    SpeechBridge, TtsConfig,
};
