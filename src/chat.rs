//! Conversational chat session against a hosted language model

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::prompt::{ChatMessage, Role};
use crate::{Error, Result};

/// Default Gemini REST endpoint
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default chat model
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash";

/// Default limit for a single chat request
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(60);

/// A hosted chat-completion service
///
/// Receives the whole conversation so far (ending with the newest user turn)
/// and returns the model's reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Generate the next assistant turn
    async fn generate(&self, model: &str, history: &[ChatMessage]) -> Result<String>;
}

/// Explicitly opened conversation with a chat backend
///
/// Successive [`send`](Self::send) calls share history, so replies depend on
/// what was said before.
pub struct ChatSession {
    backend: Box<dyn ChatBackend>,
    model: String,
    timeout: Duration,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    /// Open a session on `backend` using `model`
    pub fn open(backend: impl ChatBackend + 'static, model: impl Into<String>) -> Self {
        let model = model.into();
        tracing::debug!(model = %model, "chat session opened");
        Self {
            backend: Box::new(backend),
            model,
            timeout: DEFAULT_CHAT_TIMEOUT,
            history: Vec::new(),
        }
    }

    /// Set the limit for each request
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Turns exchanged so far
    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Submit `prompt` and return the reply verbatim
    ///
    /// On success the prompt and reply are appended to the history; on failure
    /// the history is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::Authentication` if the credential is rejected,
    /// `Error::Transport` on network failure or timeout, `Error::Cancelled` if
    /// `cancel` fires
    pub async fn send(&mut self, prompt: &str, cancel: &CancelToken) -> Result<String> {
        self.history.push(ChatMessage::user(prompt));

        let outcome = cancel
            .bounded(
                "chat request",
                self.timeout,
                self.backend.generate(&self.model, &self.history),
            )
            .await;

        match outcome {
            Ok(reply) => {
                tracing::debug!(
                    model = %self.model,
                    turns = self.history.len() + 1,
                    reply_len = reply.len(),
                    "chat reply received"
                );
                self.history.push(ChatMessage::new(Role::Assistant, reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                tracing::warn!(model = %self.model, error = %e, "chat request failed");
                Err(e)
            }
        }
    }

    /// Close the session, discarding its history
    pub fn close(self) {
        tracing::debug!(
            model = %self.model,
            turns = self.history.len(),
            "chat session closed"
        );
    }
}

/// Gemini `generateContent` request
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Gemini `generateContent` response
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Gemini REST backend
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl GeminiBackend {
    /// Create a backend for the public Gemini endpoint
    ///
    /// # Errors
    ///
    /// Returns `Error::Authentication` if the API key is empty
    pub fn new(api_key: SecretString) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_GEMINI_URL)
    }

    /// Create a backend for a custom endpoint
    ///
    /// # Errors
    ///
    /// Returns `Error::Authentication` if the API key is empty
    pub fn with_base_url(api_key: SecretString, base_url: impl Into<String>) -> Result<Self> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(Error::Authentication(
                "Gemini API key required for chat".to_string(),
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
impl ChatBackend for GeminiBackend {
    async fn generate(&self, model: &str, history: &[ChatMessage]) -> Result<String> {
        let request = GenerateRequest {
            contents: to_contents(history),
        };
        let url = format!("{}/models/{model}:generateContent", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let body: GenerateResponse = response.json().await?;
        extract_reply(body)
    }
}

/// Map history onto Gemini contents; the API only knows "user" and "model"
fn to_contents(history: &[ChatMessage]) -> Vec<Content<'_>> {
    history
        .iter()
        .map(|m| Content {
            role: match m.role {
                Role::Assistant => "model",
                Role::System | Role::User => "user",
            },
            parts: vec![Part { text: &m.content }],
        })
        .collect()
}

fn classify_failure(status: reqwest::StatusCode, body: &str) -> Error {
    if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
        || body.contains("API_KEY_INVALID")
    {
        return Error::Authentication(format!("Gemini rejected credential ({status})"));
    }
    Error::Transport(format!("Gemini error {status}: {body}"))
}

fn extract_reply(body: GenerateResponse) -> Result<String> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(Error::Transport(
            "Gemini response contained no reply text".to_string(),
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        let err = GeminiBackend::new(SecretString::from(String::new()))
            .err()
            .unwrap();
        assert!(err.is_authentication());
    }

    #[test]
    fn test_request_roles() {
        let history = vec![
            ChatMessage::user("hi"),
            ChatMessage::new(Role::Assistant, "hello"),
        ];
        let json = serde_json::to_value(GenerateRequest {
            contents: to_contents(&history),
        })
        .unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["contents"][1]["role"], "model");
    }

    #[test]
    fn test_extract_reply_joins_parts() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"I hear "},{"text":"you."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_reply(body).unwrap(), "I hear you.");
    }

    #[test]
    fn test_extract_reply_without_candidates() {
        let body: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(extract_reply(body).unwrap_err().is_transport());
    }

    #[test]
    fn test_classify_failure() {
        assert!(classify_failure(reqwest::StatusCode::FORBIDDEN, "").is_authentication());
        assert!(
            classify_failure(
                reqwest::StatusCode::BAD_REQUEST,
                r#"{"error":{"details":[{"reason":"API_KEY_INVALID"}]}}"#
            )
            .is_authentication()
        );
        assert!(classify_failure(reqwest::StatusCode::BAD_GATEWAY, "oops").is_transport());
    }
}
