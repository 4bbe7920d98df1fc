//! Client configuration.
//!
//! Settings come from three places, highest priority first: the YAML
//! configuration file (when `--config` is given), environment variables,
//! and built-in defaults. `dotenvy` loads a `.env` file into the
//! environment before any of this runs. The API key is only ever read from
//! the environment (it does not belong in a config file) and is kept in a
//! [`Zeroizing`] wrapper so it is wiped on drop.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::realtime::{
    DEFAULT_TRANSCRIPTION_MODEL, RealtimeModel, RealtimeOptions, RealtimeVoice,
};

/// Instructions used when neither the config file nor the environment
/// provides any.
pub const DEFAULT_INSTRUCTIONS: &str =
    "You are a helpful voice assistant. Keep responses concise and conversational.";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The API key environment variable is unset or empty
    #[error("missing API key: set {API_KEY_VAR}")]
    MissingApiKey,

    /// A referenced file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The configuration file could not be parsed
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

// =============================================================================
// Config File
// =============================================================================

/// YAML configuration file shape. All fields optional; the API key is
/// deliberately absent.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    /// Realtime model name
    model: Option<String>,
    /// Voice name
    voice: Option<String>,
    /// Inline system instructions
    instructions: Option<String>,
    /// Path to a file containing system instructions (overrides inline)
    instructions_file: Option<PathBuf>,
    /// Input audio transcription model
    transcription_model: Option<String>,
}

// =============================================================================
// App Config
// =============================================================================

/// Fully resolved client configuration.
#[derive(Debug)]
pub struct AppConfig {
    /// API key for the Realtime service
    pub api_key: Zeroizing<String>,
    /// Model to converse with
    pub model: RealtimeModel,
    /// Voice for audio output
    pub voice: RealtimeVoice,
    /// System instructions for the assistant
    pub instructions: String,
    /// Input audio transcription model
    pub transcription_model: String,
}

impl AppConfig {
    /// Resolve configuration from environment variables and defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] if the API key is absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(ConfigFile::default(), &env_lookup)
    }

    /// Resolve configuration from a YAML file, with environment variables
    /// filling anything the file leaves unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// API key is absent from the environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = serde_yaml::from_str(&raw)?;
        Self::resolve(file, &env_lookup)
    }

    fn resolve(
        file: ConfigFile,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = env(API_KEY_VAR)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let model = file
            .model
            .or_else(|| env("VOICECHAT_MODEL"))
            .map(|m| RealtimeModel::from_str_or_default(&m))
            .unwrap_or_default();

        let voice = file
            .voice
            .or_else(|| env("VOICECHAT_VOICE"))
            .map(|v| RealtimeVoice::from_str_or_default(&v))
            .unwrap_or_default();

        let instructions = match file.instructions_file {
            Some(path) => std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Io { path, source })?,
            None => file
                .instructions
                .or_else(|| env("VOICECHAT_INSTRUCTIONS"))
                .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
        };

        let transcription_model = file
            .transcription_model
            .or_else(|| env("VOICECHAT_TRANSCRIPTION_MODEL"))
            .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string());

        Ok(Self {
            api_key: Zeroizing::new(api_key),
            model,
            voice,
            instructions,
            transcription_model,
        })
    }

    /// Build the Realtime session options from this configuration.
    pub fn realtime_options(&self) -> RealtimeOptions {
        RealtimeOptions {
            api_key: self.api_key.to_string(),
            model: self.model,
            voice: self.voice,
            instructions: self.instructions.clone(),
            transcription_model: self.transcription_model.clone(),
            ..Default::default()
        }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

// =============================================================================
// Tests
// =============================================================================
