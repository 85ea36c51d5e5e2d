//! Persona-conditioned prompt builder
//!
//! Turns an [`EmotionAnalysis`] into a two-message conversation (persona
//! first, then the user's transcript) and flattens it into the single prompt
//! string the chat backend accepts.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::emotion::EmotionAnalysis;
use crate::{Error, Result};

/// Default therapist persona instruction
pub const DEFAULT_PERSONA: &str =
    "You are a compassionate therapist. Read the user's transcript and emotional tone. \
     Understand what they might be going through and respond empathetically. \
     Address the dominant emotion and offer supportive insights.";

/// Default user message template
///
/// `{transcript}` and `{dominant_emotion}` are substituted when rendering.
pub const DEFAULT_USER_TEMPLATE: &str =
    "Transcript: {transcript}\nDominant Emotion: {dominant_emotion}\n\nHow would you respond?";

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Capitalized label used when flattening a conversation
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// A role-tagged message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Injectable persona and template text
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PromptTemplates {
    /// System-role persona instruction
    pub persona: String,

    /// User message template with `{transcript}` / `{dominant_emotion}`
    pub user_template: String,

    /// Append the per-timestamp emotion trace to the user message
    #[serde(default)]
    pub include_emotion_trace: bool,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            user_template: DEFAULT_USER_TEMPLATE.to_string(),
            include_emotion_trace: false,
        }
    }
}

/// Builds chat prompts from emotion analyses
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    templates: PromptTemplates,
}

impl PromptBuilder {
    #[must_use]
    pub const fn new(templates: PromptTemplates) -> Self {
        Self { templates }
    }

    #[must_use]
    pub const fn templates(&self) -> &PromptTemplates {
        &self.templates
    }

    /// System-role persona message
    #[must_use]
    pub fn persona_message(&self) -> ChatMessage {
        ChatMessage::system(self.templates.persona.clone())
    }

    /// User-role message describing the analysis
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the transcript or dominant emotion is
    /// empty or whitespace-only
    pub fn user_message(&self, analysis: &EmotionAnalysis) -> Result<ChatMessage> {
        let transcript = analysis.transcript();
        let dominant = analysis.dominant_emotion();

        if transcript.trim().is_empty() {
            return Err(Error::Validation("transcript is empty".to_string()));
        }
        if dominant.trim().is_empty() {
            return Err(Error::Validation("dominant emotion is empty".to_string()));
        }

        let mut content = self
            .templates
            .user_template
            .replace("{transcript}", transcript)
            .replace("{dominant_emotion}", dominant);

        if self.templates.include_emotion_trace && !analysis.emotion_over_time().is_empty() {
            content = insert_trace(&content, analysis);
        }

        Ok(ChatMessage::user(content))
    }

    /// Persona message followed by the user message
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the analysis is incomplete
    pub fn conversation(&self, analysis: &EmotionAnalysis) -> Result<Vec<ChatMessage>> {
        Ok(vec![self.persona_message(), self.user_message(analysis)?])
    }

    /// Flattened prompt for an analysis
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the analysis is incomplete
    pub fn prompt_for(&self, analysis: &EmotionAnalysis) -> Result<String> {
        Ok(render(&self.conversation(analysis)?))
    }
}

/// Flatten messages into one prompt string
///
/// Each message becomes `"{Role}:\n{content}"`; messages are joined by a blank
/// line in the order given.
#[must_use]
pub fn render(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}:\n{}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Insert the emotion timeline before the closing question (last paragraph)
fn insert_trace(content: &str, analysis: &EmotionAnalysis) -> String {
    let mut timeline = String::from("Emotion Timeline:");
    for sample in analysis.emotion_over_time() {
        let _ = write!(timeline, "\n- {:.1}s: {}", sample.time, sample.emotion);
    }

    match content.rsplit_once("\n\n") {
        Some((body, closing)) => format!("{body}\n\n{timeline}\n\n{closing}"),
        None => format!("{content}\n\n{timeline}"),
    }
}
