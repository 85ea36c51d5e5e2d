//! Speech bridge integration tests
//!
//! Exercise streaming, ordering and sink cleanup without audio hardware

use std::time::Duration;

use async_trait::async_trait;
use solace::voice::{AudioStream, StreamLimits};
use solace::{
    CancelToken, Error, Result, ScopedAudioSink, SpeechBackend, SpeechBridge, TtsConfig,
};

mod common;
use common::{RecordingSink, ScriptedSpeech, five_chunks};

#[tokio::test]
async fn test_chunks_played_in_arrival_order() {
    let backend = ScriptedSpeech::new(five_chunks());
    let bridge = SpeechBridge::new(backend);
    let config = TtsConfig::configure("en", 22050).unwrap();
    let (sink, log) = RecordingSink::new(22050);
    let mut sink = ScopedAudioSink::new(sink);

    let report = bridge
        .stream_and_play(&mut sink, "I hear you.", &config, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.chunks, 5);
    assert_eq!(report.bytes, 10);
    assert_eq!(log.lock().unwrap().played, five_chunks());

    sink.finish().unwrap();
    assert_eq!(log.lock().unwrap().releases, 1);
}

#[tokio::test]
async fn test_rate_mismatch_rejected_before_streaming() {
    let backend = ScriptedSpeech::new(five_chunks());
    let bridge = SpeechBridge::new(backend.clone());
    let config = TtsConfig::configure("en", 16000).unwrap();
    let (sink, log) = RecordingSink::new(22050);
    let mut sink = ScopedAudioSink::new(sink);

    let err = bridge
        .stream_and_play(&mut sink, "hello", &config, &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::ConfigMismatch {
            sink: 22050,
            config: 16000
        }
    ));
    assert!(log.lock().unwrap().played.is_empty());
    assert_eq!(backend.open_count(), 0);
}

#[tokio::test]
async fn test_interruption_releases_sink_and_propagates() {
    let backend = ScriptedSpeech::new(five_chunks()).failing_after(2);
    let bridge = SpeechBridge::new(backend);
    let config = TtsConfig::configure("en", 22050).unwrap();
    let (sink, log) = RecordingSink::new(22050);

    let outcome = async {
        let mut sink = ScopedAudioSink::new(sink);
        bridge
            .stream_and_play(&mut sink, "hello", &config, &CancelToken::new())
            .await
    }
    .await;

    let err = outcome.unwrap_err();
    assert!(err.is_transport());

    let log = log.lock().unwrap();
    assert_eq!(log.played.len(), 2);
    assert_eq!(log.releases, 1);
}

#[tokio::test]
async fn test_empty_text_rejected() {
    let bridge = SpeechBridge::new(ScriptedSpeech::new(five_chunks()));
    let config = TtsConfig::configure("en", 22050).unwrap();
    let (sink, _log) = RecordingSink::new(22050);
    let mut sink = ScopedAudioSink::new(sink);

    let err = bridge
        .stream_and_play(&mut sink, "  ", &config, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

/// Backend that yields one chunk and then never another
struct StallingSpeech;

#[async_trait]
impl SpeechBackend for StallingSpeech {
    async fn open_stream(&self, _text: &str, _config: &TtsConfig) -> Result<AudioStream> {
        use futures::StreamExt;
        let first = futures::stream::iter(vec![Ok(solace::AudioChunk::new(vec![1, 0]))]);
        Ok(first.chain(futures::stream::pending()).boxed())
    }
}

#[tokio::test]
async fn test_stalled_stream_times_out() {
    let bridge = SpeechBridge::new(StallingSpeech).with_limits(StreamLimits {
        connect: Duration::from_secs(1),
        chunk: Duration::from_millis(20),
    });
    let config = TtsConfig::configure("en", 22050).unwrap();
    let (sink, log) = RecordingSink::new(22050);

    {
        let mut sink = ScopedAudioSink::new(sink);
        let err = bridge
            .stream_and_play(&mut sink, "hello", &config, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    let log = log.lock().unwrap();
    assert_eq!(log.played.len(), 1);
    assert_eq!(log.releases, 1);
}

#[tokio::test]
async fn test_cancel_stops_stalled_stream() {
    let bridge = SpeechBridge::new(StallingSpeech);
    let config = TtsConfig::configure("en", 22050).unwrap();
    let (sink, log) = RecordingSink::new(22050);
    let cancel = CancelToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    {
        let mut sink = ScopedAudioSink::new(sink);
        let err = bridge
            .stream_and_play(&mut sink, "hello", &config, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    assert_eq!(log.lock().unwrap().releases, 1);
}
