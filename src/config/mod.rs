//! Configuration management for Solace
//!
//! Values resolve as environment → TOML file → defaults. Credentials are only
//! required by the operations that use them.

pub mod file;

use std::time::Duration;

use secrecy::SecretString;

use crate::chat::{DEFAULT_CHAT_MODEL, DEFAULT_CHAT_TIMEOUT, DEFAULT_GEMINI_URL};
use crate::prompt::{PromptBuilder, PromptTemplates};
use crate::voice::{
    DEFAULT_CHUNK_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_NEUPHONIC_URL, StreamLimits,
    TtsConfig,
};
use crate::{Error, Result};

/// Default TTS language
pub const DEFAULT_LANG_CODE: &str = "en";

/// Default TTS and playback sampling rate
pub const DEFAULT_SAMPLING_RATE: u32 = 22050;

/// Default companion server port
pub const DEFAULT_SERVER_PORT: u16 = 3001;

/// Solace configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API keys
    pub api_keys: ApiKeys,

    /// Chat backend configuration
    pub chat: ChatConfig,

    /// Text-to-speech configuration
    pub tts: TtsSettings,

    /// Persona and prompt templates
    pub prompt: PromptTemplates,

    /// Companion server configuration
    pub server: ServerConfig,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Gemini API key (chat)
    pub gemini: Option<SecretString>,

    /// Neuphonic API key (TTS)
    pub neuphonic: Option<SecretString>,
}

/// Chat backend configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model identifier
    pub model: String,

    /// REST base URL
    pub base_url: String,

    /// Per-request timeout
    pub timeout: Duration,
}

/// Text-to-speech configuration
#[derive(Debug, Clone)]
pub struct TtsSettings {
    /// Language code
    pub lang_code: String,

    /// Output sampling rate; playback opens at the same rate
    pub sampling_rate: u32,

    /// Voice identifier
    pub voice_id: Option<String>,

    /// Speech rate multiplier
    pub speed: Option<f32>,

    /// REST base URL
    pub base_url: String,

    /// Stream setup and inter-chunk limits
    pub limits: StreamLimits,
}

/// Companion server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
}

impl Config {
    /// Load configuration from the environment and config file
    ///
    /// Reads `.env` from the working directory first, if present.
    ///
    /// # Errors
    ///
    /// Returns error if an environment value cannot be parsed
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if an environment value cannot be parsed
    pub fn from_sources(
        fc: file::SolaceConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        // API keys (env > toml > None); the TTS key also answers to its
        // historical misspelling
        let api_keys = ApiKeys {
            gemini: env("GEMINI_API_KEY")
                .or(fc.api_keys.gemini)
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
            neuphonic: env("NEUPHONIC_API_KEY")
                .or_else(|| env("NUEPHONIC_API_KEY"))
                .or(fc.api_keys.neuphonic)
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
        };

        let chat = ChatConfig {
            model: env("SOLACE_CHAT_MODEL")
                .or(fc.chat.model)
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            base_url: fc
                .chat
                .base_url
                .unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string()),
            timeout: fc
                .chat
                .timeout_secs
                .map_or(DEFAULT_CHAT_TIMEOUT, Duration::from_secs),
        };

        let sampling_rate = match env("SOLACE_TTS_SAMPLING_RATE") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                Error::Config(format!("SOLACE_TTS_SAMPLING_RATE={raw:?}: {e}"))
            })?,
            None => fc.tts.sampling_rate.unwrap_or(DEFAULT_SAMPLING_RATE),
        };

        let tts = TtsSettings {
            lang_code: env("SOLACE_TTS_LANG")
                .or(fc.tts.lang_code)
                .unwrap_or_else(|| DEFAULT_LANG_CODE.to_string()),
            sampling_rate,
            voice_id: env("SOLACE_TTS_VOICE").or(fc.tts.voice_id),
            speed: fc.tts.speed,
            base_url: fc
                .tts
                .base_url
                .unwrap_or_else(|| DEFAULT_NEUPHONIC_URL.to_string()),
            limits: StreamLimits {
                connect: fc
                    .tts
                    .connect_timeout_secs
                    .map_or(DEFAULT_CONNECT_TIMEOUT, Duration::from_secs),
                chunk: fc
                    .tts
                    .chunk_timeout_secs
                    .map_or(DEFAULT_CHUNK_TIMEOUT, Duration::from_secs),
            },
        };

        let defaults = PromptTemplates::default();
        let prompt = PromptTemplates {
            persona: fc.prompt.persona.unwrap_or(defaults.persona),
            user_template: fc.prompt.user_template.unwrap_or(defaults.user_template),
            include_emotion_trace: fc
                .prompt
                .include_emotion_trace
                .unwrap_or(defaults.include_emotion_trace),
        };

        let port = match env("SOLACE_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("SOLACE_PORT={raw:?}: {e}")))?,
            None => fc.server.port.unwrap_or(DEFAULT_SERVER_PORT),
        };

        Ok(Self {
            api_keys,
            chat,
            tts,
            prompt,
            server: ServerConfig { port },
        })
    }

    /// Chat credential
    ///
    /// # Errors
    ///
    /// Returns `Error::Authentication` if no Gemini key is configured
    pub fn chat_api_key(&self) -> Result<SecretString> {
        self.api_keys.gemini.clone().ok_or_else(|| {
            Error::Authentication("GEMINI_API_KEY is not set".to_string())
        })
    }

    /// TTS credential
    ///
    /// # Errors
    ///
    /// Returns `Error::Authentication` if no Neuphonic key is configured
    pub fn tts_api_key(&self) -> Result<SecretString> {
        self.api_keys.neuphonic.clone().ok_or_else(|| {
            Error::Authentication("NEUPHONIC_API_KEY is not set".to_string())
        })
    }

    /// Validated synthesis settings
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for an unsupported language, zero rate or
    /// out-of-range speed
    pub fn tts_config(&self) -> Result<TtsConfig> {
        let mut config = TtsConfig::configure(&self.tts.lang_code, self.tts.sampling_rate)?;
        if let Some(voice) = &self.tts.voice_id {
            config = config.with_voice_id(voice.clone());
        }
        if let Some(speed) = self.tts.speed {
            config = config.with_speed(speed)?;
        }
        Ok(config)
    }

    /// Prompt builder using the configured templates
    #[must_use]
    pub fn prompt_builder(&self) -> PromptBuilder {
        PromptBuilder::new(self.prompt.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::file::SolaceConfigFile;
    use super::*;
    use crate::prompt::DEFAULT_PERSONA;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(SolaceConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.chat.model, "gemini-2.0-flash");
        assert_eq!(config.tts.lang_code, "en");
        assert_eq!(config.tts.sampling_rate, 22050);
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.prompt.persona, DEFAULT_PERSONA);
        assert!(config.api_keys.gemini.is_none());
    }

    #[test]
    fn test_missing_credentials_are_authentication_errors() {
        let config = Config::from_sources(SolaceConfigFile::default(), env_from(&[])).unwrap();
        assert!(config.chat_api_key().unwrap_err().is_authentication());
        assert!(config.tts_api_key().unwrap_err().is_authentication());
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let config = Config::from_sources(
            SolaceConfigFile::default(),
            env_from(&[("GEMINI_API_KEY", "  ")]),
        )
        .unwrap();
        assert!(config.chat_api_key().is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut fc = SolaceConfigFile::default();
        fc.chat.model = Some("from-file".to_string());
        fc.tts.sampling_rate = Some(16000);
        fc.api_keys.gemini = Some("file-key".to_string());

        let config = Config::from_sources(
            fc,
            env_from(&[
                ("SOLACE_CHAT_MODEL", "from-env"),
                ("GEMINI_API_KEY", "env-key"),
            ]),
        )
        .unwrap();

        assert_eq!(config.chat.model, "from-env");
        assert_eq!(config.tts.sampling_rate, 16000);
        assert_eq!(config.chat_api_key().unwrap().expose_secret(), "env-key");
    }

    #[test]
    fn test_legacy_tts_key_name() {
        let config = Config::from_sources(
            SolaceConfigFile::default(),
            env_from(&[("NUEPHONIC_API_KEY", "legacy")]),
        )
        .unwrap();
        assert_eq!(config.tts_api_key().unwrap().expose_secret(), "legacy");
    }

    #[test]
    fn test_bad_sampling_rate_env() {
        let err = Config::from_sources(
            SolaceConfigFile::default(),
            env_from(&[("SOLACE_TTS_SAMPLING_RATE", "fast")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_tts_config_applies_voice_and_speed() {
        let mut fc = SolaceConfigFile::default();
        fc.tts.voice_id = Some("voice-1".to_string());
        fc.tts.speed = Some(1.15);

        let config = Config::from_sources(fc, env_from(&[])).unwrap();
        let tts = config.tts_config().unwrap();
        assert_eq!(tts.voice_id(), Some("voice-1"));
        assert_eq!(tts.speed(), Some(1.15));
        assert_eq!(tts.sampling_rate(), 22050);
    }

    #[test]
    fn test_prompt_overrides() {
        let mut fc = SolaceConfigFile::default();
        fc.prompt.persona = Some("Be kind.".to_string());
        fc.prompt.include_emotion_trace = Some(true);

        let config = Config::from_sources(fc, env_from(&[])).unwrap();
        let builder = config.prompt_builder();
        assert_eq!(builder.persona_message().content, "Be kind.");
        assert!(builder.templates().include_emotion_trace);
    }
}
