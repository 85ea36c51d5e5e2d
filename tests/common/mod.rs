//! Shared test utilities
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use solace::voice::AudioStream;
use solace::{
    AudioChunk, AudioSink, ChatBackend, ChatMessage, Error, Result, SpeechBackend, TtsConfig,
};

/// Chat backend that always answers with the same text
#[derive(Clone, Default)]
pub struct FixedChat {
    pub reply: String,
    /// History received on each call
    pub calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl FixedChat {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl ChatBackend for FixedChat {
    async fn generate(&self, _model: &str, history: &[ChatMessage]) -> Result<String> {
        self.calls.lock().unwrap().push(history.to_vec());
        Ok(self.reply.clone())
    }
}

/// Chat backend whose every call fails with a transport error
pub struct DownChat;

#[async_trait]
impl ChatBackend for DownChat {
    async fn generate(&self, _model: &str, _history: &[ChatMessage]) -> Result<String> {
        Err(Error::Transport("connection refused".to_string()))
    }
}

/// Speech backend replaying fixed chunks, optionally failing part-way
#[derive(Clone, Default)]
pub struct ScriptedSpeech {
    pub chunks: Vec<Vec<u8>>,
    /// Fail with a transport error after this many chunks
    pub fail_after: Option<usize>,
    /// Number of times a stream was opened
    pub opened: Arc<Mutex<usize>>,
}

impl ScriptedSpeech {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            ..Self::default()
        }
    }

    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn open_count(&self) -> usize {
        *self.opened.lock().unwrap()
    }
}

#[async_trait]
impl SpeechBackend for ScriptedSpeech {
    async fn open_stream(&self, _text: &str, _config: &TtsConfig) -> Result<AudioStream> {
        *self.opened.lock().unwrap() += 1;

        let mut items: Vec<Result<AudioChunk>> = self
            .chunks
            .iter()
            .take(self.fail_after.unwrap_or(usize::MAX))
            .cloned()
            .map(|pcm| Ok(AudioChunk::new(pcm)))
            .collect();
        if self.fail_after.is_some() {
            items.push(Err(Error::Transport("stream interrupted".to_string())));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// What a [`RecordingSink`] saw
#[derive(Debug, Default)]
pub struct SinkLog {
    pub played: Vec<Vec<u8>>,
    pub releases: usize,
}

/// Sink that records played chunks and releases in a shared log
pub struct RecordingSink {
    pub rate: u32,
    pub log: Arc<Mutex<SinkLog>>,
}

impl RecordingSink {
    pub fn new(rate: u32) -> (Self, Arc<Mutex<SinkLog>>) {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        (
            Self {
                rate,
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl AudioSink for RecordingSink {
    fn sample_rate(&self) -> u32 {
        self.rate
    }

    fn play(&mut self, chunk: &AudioChunk) -> Result<()> {
        self.log.lock().unwrap().played.push(chunk.as_bytes().to_vec());
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.log.lock().unwrap().releases += 1;
        Ok(())
    }
}

/// Five distinct two-byte chunks
pub fn five_chunks() -> Vec<Vec<u8>> {
    (1..=5_u8).map(|i| vec![i, 0]).collect()
}
