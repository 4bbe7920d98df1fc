//! Realtime API WebSocket event types.
//!
//! All events are JSON objects tagged by a `type` field and sent as text
//! frames over the WebSocket.
//!
//! Client events (sent to server):
//! - session.update - Configure the session (sent exactly once, first)
//! - input_audio_buffer.append - Append captured audio to the input buffer
//! - response.cancel - Abort the in-flight response generation
//!
//! Server events (received from server):
//! - response.audio_transcript.delta - Assistant transcript fragment
//! - response.audio.delta - Assistant audio chunk (base64 pcm16)
//! - input_audio_buffer.speech_started - Server VAD saw the user speak
//! - input_audio_buffer.speech_stopped - Server VAD saw silence
//! - conversation.item.input_audio_transcription.completed - User transcript
//! - response.done - Response generation finished
//! - session.created / session.updated - Session lifecycle
//! - error - Server-reported error
//!
//! Anything else deserializes to [`ServerEvent::Unknown`] and is ignored,
//! so new server event types never break the receive loop.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::{AUDIO_FORMAT, RealtimeOptions};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration carried by `session.update`.
///
/// Unlike most of the protocol surface this client sends every field on
/// every handshake, so the fields are concrete rather than optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text and audio)
    pub modalities: Vec<String>,

    /// System instructions for the assistant
    pub instructions: String,

    /// Voice for audio output
    pub voice: String,

    /// Input audio format (always "pcm16")
    pub input_audio_format: String,

    /// Output audio format (always "pcm16")
    pub output_audio_format: String,

    /// Input audio transcription configuration
    pub input_audio_transcription: InputAudioTranscription,
}

impl SessionConfig {
    /// Build the one session configuration this client ever sends.
    pub fn from_options(options: &RealtimeOptions) -> Self {
        Self {
            modalities: vec!["text".to_string(), "audio".to_string()],
            instructions: options.instructions.clone(),
            voice: options.voice.as_str().to_string(),
            input_audio_format: AUDIO_FORMAT.to_string(),
            output_audio_format: AUDIO_FORMAT.to_string(),
            input_audio_transcription: InputAudioTranscription {
                model: options.transcription_model.clone(),
            },
        }
    }
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the Realtime API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Configure the session
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded pcm16 audio
        audio: String,
    },

    /// Cancel the current response
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

impl ClientEvent {
    /// Create an audio append event from raw PCM16 bytes.
    pub fn audio_append(data: &[u8]) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: BASE64_STANDARD.encode(data),
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events received from the Realtime API.
///
/// Only the fields this client reads are declared; serde ignores the rest
/// of each payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error reported by the server
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session information
        session: SessionInfo,
    },

    /// Session configuration acknowledged
    #[serde(rename = "session.updated")]
    SessionUpdated {
        /// Session information
        session: SessionInfo,
    },

    /// Server VAD detected the user speaking
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,

    /// Server VAD detected silence
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped,

    /// Transcription of the user's speech completed
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        /// Transcript text
        transcript: String,
    },

    /// Assistant transcript fragment
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {
        /// Transcript delta
        delta: String,
    },

    /// Assistant audio chunk
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Base64-encoded pcm16 audio delta
        delta: String,
    },

    /// Response generation finished
    #[serde(rename = "response.done")]
    ResponseDone,

    /// Any event type this client does not handle
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Decode the base64 audio payload of an `AudioDelta` event.
    pub fn decode_audio_delta(delta: &str) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(delta)
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

/// Server-reported error information.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error code
    #[serde(default)]
    pub code: Option<String>,
    /// Error message
    pub message: String,
}

/// Session information from `session.created` / `session.updated`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    /// Session ID
    pub id: String,
    /// Model in use
    #[serde(default)]
    pub model: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
