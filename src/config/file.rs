//! TOML configuration file loading
//!
//! Supports `~/.config/solace/config.toml` (or `$SOLACE_CONFIG`) as a
//! persistent config source. All fields are optional; the file is a partial
//! overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct SolaceConfigFile {
    /// Chat backend configuration
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// Text-to-speech configuration
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// Persona and prompt template overrides
    #[serde(default)]
    pub prompt: PromptFileConfig,

    /// Companion server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Chat backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct ChatFileConfig {
    /// Model identifier (e.g. "gemini-2.0-flash")
    pub model: Option<String>,

    /// REST base URL
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Text-to-speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// Language code (e.g. "en")
    pub lang_code: Option<String>,

    /// Output sampling rate in Hz
    pub sampling_rate: Option<u32>,

    /// Voice identifier
    pub voice_id: Option<String>,

    /// Speech rate multiplier
    pub speed: Option<f32>,

    /// REST base URL
    pub base_url: Option<String>,

    /// Stream setup timeout in seconds
    pub connect_timeout_secs: Option<u64>,

    /// Inter-chunk timeout in seconds
    pub chunk_timeout_secs: Option<u64>,
}

/// Persona and prompt template overrides
#[derive(Debug, Default, Deserialize)]
pub struct PromptFileConfig {
    pub persona: Option<String>,
    pub user_template: Option<String>,
    pub include_emotion_trace: Option<bool>,
}

/// Companion server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub port: Option<u16>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub gemini: Option<String>,
    pub neuphonic: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `SolaceConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> SolaceConfigFile {
    config_file_path().map_or_else(SolaceConfigFile::default, |path| load_config_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_from(path: &Path) -> SolaceConfigFile {
    if !path.exists() {
        return SolaceConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                SolaceConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            SolaceConfigFile::default()
        }
    }
}

/// Return the config file path: `$SOLACE_CONFIG` or `~/.config/solace/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SOLACE_CONFIG") {
        return Some(PathBuf::from(path));
    }
    directories::BaseDirs::new().map(|d| d.config_dir().join("solace").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[chat]
model = "gemini-1.5-pro"

[tts]
sampling_rate = 16000
speed = 1.15
"#
        )
        .unwrap();

        let config = load_config_from(file.path());
        assert_eq!(config.chat.model.as_deref(), Some("gemini-1.5-pro"));
        assert_eq!(config.chat.timeout_secs, None);
        assert_eq!(config.tts.sampling_rate, Some(16000));
        assert_eq!(config.tts.speed, Some(1.15));
        assert!(config.api_keys.gemini.is_none());
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tts\nsampling_rate = ").unwrap();

        let config = load_config_from(file.path());
        assert!(config.tts.sampling_rate.is_none());
    }

    #[test]
    fn test_missing_file() {
        let config = load_config_from(Path::new("/nonexistent/solace/config.toml"));
        assert!(config.chat.model.is_none());
    }
}
