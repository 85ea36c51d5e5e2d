//! Audio playback to speakers

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use super::sink::{AudioChunk, AudioSink, PcmDecoder, ScopedAudioSink};
use crate::{Error, Result};

/// Extra time allowed for the device to drain queued audio on release
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Streams audio chunks to the default output device
///
/// Chunks are queued as they arrive and the device callback pulls from the
/// queue, so playback starts with the first chunk.
pub struct CpalSink {
    sample_rate: u32,
    queue: Arc<Mutex<VecDeque<f32>>>,
    decoder: PcmDecoder,
    stream: Option<Stream>,
}

impl CpalSink {
    /// Open the default output device at `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns error if no device supports the rate or the stream cannot start
    pub fn open(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let rate = SampleRate(sample_rate);
        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| c.channels() == 1 && supports(c, rate))
            .or_else(|| {
                // Fallback: stereo, duplicating the mono signal
                device
                    .supported_output_configs()
                    .ok()?
                    .find(|c| c.channels() == 2 && supports(c, rate))
            })
            .ok_or_else(|| {
                Error::Audio(format!("no output config supports {sample_rate} Hz"))
            })?;

        let config: StreamConfig = supported_config.with_sample_rate(rate).config();
        let channels = usize::from(config.channels);

        let queue = Arc::new(Mutex::new(VecDeque::<f32>::new()));
        let queue_clone = Arc::clone(&queue);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut queue) = queue_clone.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    for frame in data.chunks_mut(channels) {
                        let sample = queue.pop_front().unwrap_or(0.0);
                        frame.fill(sample);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "audio playback opened"
        );

        Ok(Self {
            sample_rate,
            queue,
            decoder: PcmDecoder::new(),
            stream: Some(stream),
        })
    }

    fn queued(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl AudioSink for CpalSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&mut self, chunk: &AudioChunk) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::Audio("playback stream closed".to_string()));
        }
        let samples = self.decoder.decode(chunk.as_bytes());
        self.queue
            .lock()
            .map_err(|_| Error::Audio("playback queue poisoned".to_string()))?
            .extend(samples);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };

        if self.decoder.has_pending() {
            tracing::debug!("dropping incomplete trailing sample");
        }

        // Let queued audio play out, bounded by its own duration
        let pending = self.queued() as u64;
        let playtime = Duration::from_millis(pending * 1000 / u64::from(self.sample_rate));
        let deadline = Instant::now() + playtime + DRAIN_GRACE;

        while self.queued() > 0 {
            if Instant::now() > deadline {
                tracing::warn!(remaining = self.queued(), "playback drain timed out");
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        // Small delay so the device plays out its own buffer
        std::thread::sleep(Duration::from_millis(100));

        drop(stream);
        tracing::debug!("audio playback released");
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };

        let discarded = self.queue.lock().map(|mut q| {
            let n = q.len();
            q.clear();
            n
        });
        drop(stream);
        tracing::debug!(discarded = discarded.unwrap_or(0), "audio playback aborted");
        Ok(())
    }
}

fn supports(config: &cpal::SupportedStreamConfigRange, rate: SampleRate) -> bool {
    config.min_sample_rate() <= rate && config.max_sample_rate() >= rate
}

/// Acquire the default output device for scoped playback
///
/// # Errors
///
/// Returns `Error::Validation` for a zero rate, `Error::Audio` if the device
/// cannot be opened
pub fn open_playback_sink(sample_rate: u32) -> Result<ScopedAudioSink<CpalSink>> {
    if sample_rate == 0 {
        return Err(Error::Validation(
            "playback sampling rate must be positive".to_string(),
        ));
    }
    Ok(ScopedAudioSink::new(CpalSink::open(sample_rate)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_rejected_before_device_access() {
        let err = open_playback_sink(0).err().unwrap();
        assert!(err.is_validation());
    }
}
