//! Realtime API configuration types.
//!
//! Model and voice selection for the remote session, plus the endpoint and
//! audio constants. Audio formats are not configurable: the client speaks
//! PCM16 mono at 24 kHz in both directions.

use serde::{Deserialize, Serialize};

/// OpenAI Realtime API WebSocket endpoint.
pub const REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Sample rate used by the Realtime API for pcm16 audio.
pub const REALTIME_SAMPLE_RATE: u32 = 24_000;

/// Wire name of the only audio format this client uses.
pub const AUDIO_FORMAT: &str = "pcm16";

/// Default model for input audio transcription.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

// =============================================================================
// Models
// =============================================================================

/// Supported Realtime models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RealtimeModel {
    /// GPT-4o Realtime Preview model
    #[default]
    #[serde(rename = "gpt-4o-realtime-preview")]
    Gpt4oRealtimePreview,
    /// GPT-4o Realtime Preview 2024-12-17
    #[serde(rename = "gpt-4o-realtime-preview-2024-12-17")]
    Gpt4oRealtimePreview20241217,
    /// GPT-4o Mini Realtime Preview
    #[serde(rename = "gpt-4o-mini-realtime-preview")]
    Gpt4oMiniRealtimePreview,
    /// GPT-4o Mini Realtime Preview 2024-12-17
    #[serde(rename = "gpt-4o-mini-realtime-preview-2024-12-17")]
    Gpt4oMiniRealtimePreview20241217,
}

impl RealtimeModel {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpt4oRealtimePreview => "gpt-4o-realtime-preview",
            Self::Gpt4oRealtimePreview20241217 => "gpt-4o-realtime-preview-2024-12-17",
            Self::Gpt4oMiniRealtimePreview => "gpt-4o-mini-realtime-preview",
            Self::Gpt4oMiniRealtimePreview20241217 => "gpt-4o-mini-realtime-preview-2024-12-17",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "gpt-4o-realtime-preview" => Self::Gpt4oRealtimePreview,
            "gpt-4o-realtime-preview-2024-12-17" => Self::Gpt4oRealtimePreview20241217,
            "gpt-4o-mini-realtime-preview" => Self::Gpt4oMiniRealtimePreview,
            "gpt-4o-mini-realtime-preview-2024-12-17" => Self::Gpt4oMiniRealtimePreview20241217,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for RealtimeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Voices
// =============================================================================

/// Available voices for the Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeVoice {
    /// Alloy voice (default)
    #[default]
    Alloy,
    /// Ash voice
    Ash,
    /// Ballad voice
    Ballad,
    /// Coral voice
    Coral,
    /// Echo voice
    Echo,
    /// Sage voice
    Sage,
    /// Shimmer voice
    Shimmer,
    /// Verse voice
    Verse,
}

impl RealtimeVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "alloy" => Self::Alloy,
            "ash" => Self::Ash,
            "ballad" => Self::Ballad,
            "coral" => Self::Coral,
            "echo" => Self::Echo,
            "sage" => Self::Sage,
            "shimmer" => Self::Shimmer,
            "verse" => Self::Verse,
            _ => Self::default(),
        }
    }

    /// Get all available voices.
    pub fn all() -> &'static [RealtimeVoice] {
        &[
            Self::Alloy,
            Self::Ash,
            Self::Ballad,
            Self::Coral,
            Self::Echo,
            Self::Sage,
            Self::Shimmer,
            Self::Verse,
        ]
    }
}

impl std::fmt::Display for RealtimeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Session Options
// =============================================================================

/// Everything needed to establish and configure one Realtime session.
#[derive(Debug, Clone)]
pub struct RealtimeOptions {
    /// API key for authentication
    pub api_key: String,
    /// Model to converse with
    pub model: RealtimeModel,
    /// Voice for audio output
    pub voice: RealtimeVoice,
    /// System instructions for the assistant
    pub instructions: String,
    /// Model for input audio transcription
    pub transcription_model: String,
    /// WebSocket endpoint, without the model query parameter
    pub endpoint: String,
}

impl Default for RealtimeOptions {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: RealtimeModel::default(),
            voice: RealtimeVoice::default(),
            instructions: String::new(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            endpoint: REALTIME_URL.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_as_str() {
        assert_eq!(
            RealtimeModel::Gpt4oRealtimePreview.as_str(),
            "gpt-4o-realtime-preview"
        );
        assert_eq!(
            RealtimeModel::Gpt4oMiniRealtimePreview.as_str(),
            "gpt-4o-mini-realtime-preview"
        );
    }

    #[test]
    fn test_model_from_str() {
        assert_eq!(
            RealtimeModel::from_str_or_default("gpt-4o-realtime-preview-2024-12-17"),
            RealtimeModel::Gpt4oRealtimePreview20241217
        );
        assert_eq!(
            RealtimeModel::from_str_or_default("unknown"),
            RealtimeModel::Gpt4oRealtimePreview
        );
    }

    #[test]
    fn test_voice_from_str() {
        assert_eq!(
            RealtimeVoice::from_str_or_default("SHIMMER"),
            RealtimeVoice::Shimmer
        );
        assert_eq!(
            RealtimeVoice::from_str_or_default("unknown"),
            RealtimeVoice::Alloy
        );
    }

    #[test]
    fn test_voice_all() {
        let voices = RealtimeVoice::all();
        assert_eq!(voices.len(), 8);
        assert!(voices.contains(&RealtimeVoice::Alloy));
        assert!(voices.contains(&RealtimeVoice::Verse));
    }

    #[test]
    fn test_default_options() {
        let options = RealtimeOptions::default();
        assert!(options.api_key.is_empty());
        assert_eq!(options.endpoint, REALTIME_URL);
        assert_eq!(options.transcription_model, "whisper-1");
    }
}
