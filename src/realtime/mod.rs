//! Realtime API connection layer.
//!
//! A persistent WebSocket to OpenAI's Realtime API carrying typed JSON
//! events in both directions. The connection is configured exactly once,
//! immediately after the transport is established and before any audio is
//! streamed; there is no mid-session reconfiguration and no reconnection.
//! A dropped transport ends the conversation.

mod config;
mod connection;
mod events;

pub use config::{
    AUDIO_FORMAT, DEFAULT_TRANSCRIPTION_MODEL, REALTIME_SAMPLE_RATE, REALTIME_URL, RealtimeModel,
    RealtimeOptions, RealtimeVoice,
};
pub use connection::{EventSender, RealtimeConnection};
pub use events::{
    ApiError, ClientEvent, InputAudioTranscription, ServerEvent, SessionConfig, SessionInfo,
};

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by the Realtime connection layer.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Transport could not be established or dropped unexpectedly
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("websocket error: {0}")]
    WebSocketError(String),

    /// Outbound event could not be serialized
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Malformed inbound payload
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// Connection is gone
    #[error("not connected")]
    NotConnected,
}

/// Result type for Realtime connection operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;
