//! Emotion analysis input
//!
//! An [`EmotionAnalysis`] is produced upstream by an emotion-recognition
//! service and consumed once by the prompt builder. It is validated on
//! construction and read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single point on the emotion trace
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmotionSample {
    /// Offset into the recording, in seconds
    pub time: f64,

    /// Detected emotion label (e.g. "sad", "neutral")
    pub emotion: String,
}

impl EmotionSample {
    #[must_use]
    pub fn new(time: f64, emotion: impl Into<String>) -> Self {
        Self {
            time,
            emotion: emotion.into(),
        }
    }
}

/// Wire shape of an analysis, before validation
#[derive(Deserialize)]
struct RawAnalysis {
    transcript: String,
    dominant_emotion: String,
    #[serde(default)]
    emotion_over_time: Vec<EmotionSample>,
}

impl TryFrom<RawAnalysis> for EmotionAnalysis {
    type Error = Error;

    fn try_from(raw: RawAnalysis) -> Result<Self> {
        Self::new(raw.transcript, raw.dominant_emotion, raw.emotion_over_time)
    }
}

/// Transcript plus detected emotions for one utterance
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawAnalysis")]
pub struct EmotionAnalysis {
    transcript: String,
    dominant_emotion: String,
    emotion_over_time: Vec<EmotionSample>,
}

impl EmotionAnalysis {
    /// Build an analysis, validating the emotion trace
    ///
    /// Transcript and dominant emotion may be empty here; the prompt builder
    /// rejects them when rendering.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if a sample time is negative or not finite,
    /// or if the trace is not in chronological order
    pub fn new(
        transcript: impl Into<String>,
        dominant_emotion: impl Into<String>,
        emotion_over_time: Vec<EmotionSample>,
    ) -> Result<Self> {
        let mut previous = 0.0_f64;
        for (index, sample) in emotion_over_time.iter().enumerate() {
            if !sample.time.is_finite() || sample.time < 0.0 {
                return Err(Error::Validation(format!(
                    "emotion sample {index} has invalid time {}",
                    sample.time
                )));
            }
            if sample.time < previous {
                return Err(Error::Validation(format!(
                    "emotion sample {index} at {}s precedes previous sample at {previous}s",
                    sample.time
                )));
            }
            previous = sample.time;
        }

        Ok(Self {
            transcript: transcript.into(),
            dominant_emotion: dominant_emotion.into(),
            emotion_over_time,
        })
    }

    /// Parse an analysis from the upstream service's JSON
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` for malformed JSON, `Error::Validation`
    /// for a well-formed analysis whose trace is invalid
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawAnalysis = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// Built-in demo input
    #[must_use]
    pub fn sample() -> Self {
        Self {
            transcript: "I\u{2019}ve been feeling off lately, like nothing makes sense."
                .to_string(),
            dominant_emotion: "sad".to_string(),
            emotion_over_time: vec![
                EmotionSample::new(1.2, "sad"),
                EmotionSample::new(3.4, "neutral"),
            ],
        }
    }

    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    #[must_use]
    pub fn dominant_emotion(&self) -> &str {
        &self.dominant_emotion
    }

    #[must_use]
    pub fn emotion_over_time(&self) -> &[EmotionSample] {
        &self.emotion_over_time
    }
}
