//! Audio chunks and scoped playback sinks

use crate::{Error, Result};

/// One piece of synthesized audio
///
/// Signed 16-bit little-endian mono PCM at the stream's sampling rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pcm: Vec<u8>,
}

impl AudioChunk {
    #[must_use]
    pub const fn new(pcm: Vec<u8>) -> Self {
        Self { pcm }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.pcm
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pcm.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    /// Decode this chunk alone to f32 samples in [-1.0, 1.0]
    ///
    /// A trailing odd byte is ignored; use [`PcmDecoder`] for a stream of
    /// chunks that may split a sample.
    #[must_use]
    pub fn samples(&self) -> Vec<f32> {
        self.pcm
            .chunks_exact(2)
            .map(|b| sample_to_f32([b[0], b[1]]))
            .collect()
    }
}

fn sample_to_f32(bytes: [u8; 2]) -> f32 {
    f32::from(i16::from_le_bytes(bytes)) / 32768.0
}

/// Decodes 16-bit PCM arriving in chunks of arbitrary length
///
/// A sample split across two chunks is carried over and completed by the
/// next chunk.
#[derive(Debug, Default)]
pub struct PcmDecoder {
    pending: Option<u8>,
}

impl PcmDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Decode `bytes`, continuing from the previous call
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<f32> {
        let mut samples = Vec::with_capacity(bytes.len() / 2 + 1);
        let mut rest = bytes;

        if let Some(low) = self.pending.take() {
            let Some((&high, tail)) = rest.split_first() else {
                self.pending = Some(low);
                return samples;
            };
            samples.push(sample_to_f32([low, high]));
            rest = tail;
        }

        let mut pairs = rest.chunks_exact(2);
        samples.extend(pairs.by_ref().map(|b| sample_to_f32([b[0], b[1]])));
        self.pending = pairs.remainder().first().copied();
        samples
    }

    /// Whether half a sample is waiting for the next chunk
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Destination for streamed audio
pub trait AudioSink {
    /// Rate the sink plays at, in Hz
    fn sample_rate(&self) -> u32;

    /// Hand a chunk to the output
    ///
    /// # Errors
    ///
    /// Returns error if the output rejects the chunk
    fn play(&mut self, chunk: &AudioChunk) -> Result<()>;

    /// Flush pending audio and close the output
    ///
    /// # Errors
    ///
    /// Returns error if flushing fails; the sink counts as released anyway
    fn release(&mut self) -> Result<()>;

    /// Close the output without waiting for queued audio
    ///
    /// Called when playback is abandoned after an error or cancellation.
    /// Defaults to [`release`](Self::release).
    ///
    /// # Errors
    ///
    /// Returns error if closing fails; the sink counts as released anyway
    fn abort(&mut self) -> Result<()> {
        self.release()
    }
}

/// Sink that is released exactly once, on every exit path
///
/// Call [`finish`](Self::finish) to let queued audio play out and observe
/// flush errors. A guard dropped without `finish` aborts the sink instead.
pub struct ScopedAudioSink<S: AudioSink> {
    inner: S,
    released: bool,
}

impl<S: AudioSink> ScopedAudioSink<S> {
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            released: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    /// Forward a chunk to the underlying sink
    ///
    /// # Errors
    ///
    /// Returns error if the underlying sink fails
    pub fn play(&mut self, chunk: &AudioChunk) -> Result<()> {
        if self.released {
            return Err(Error::Audio("sink already released".to_string()));
        }
        self.inner.play(chunk)
    }

    pub const fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Release the sink now
    ///
    /// # Errors
    ///
    /// Returns the flush error, if any
    pub fn finish(mut self) -> Result<()> {
        self.released = true;
        self.inner.release()
    }
}

impl<S: AudioSink> Drop for ScopedAudioSink<S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.inner.abort() {
            tracing::warn!(error = %e, "failed to release audio sink");
        }
    }
}

/// In-memory sink collecting raw PCM
#[derive(Debug, Default)]
pub struct BufferSink {
    sample_rate: u32,
    pcm: Vec<u8>,
    released: bool,
}

impl BufferSink {
    #[must_use]
    pub const fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            pcm: Vec::new(),
            released: false,
        }
    }

    /// PCM collected so far
    #[must_use]
    pub fn pcm(&self) -> &[u8] {
        &self.pcm
    }

    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }
}

impl AudioSink for BufferSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&mut self, chunk: &AudioChunk) -> Result<()> {
        self.pcm.extend_from_slice(chunk.as_bytes());
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.released = true;
        Ok(())
    }
}
