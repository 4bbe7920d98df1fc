//! Real-time voice chat client for OpenAI's Realtime API.
//!
//! Bridges the local microphone and speakers to a remote conversational
//! session over a persistent WebSocket: captured audio streams out while
//! the assistant's audio and transcript stream back and play incrementally,
//! and the moment the server hears the user speak over the assistant,
//! playback is flushed and the in-flight response cancelled.

pub mod audio;
pub mod config;
pub mod realtime;
pub mod session;

// Re-export commonly used items for convenience
pub use audio::{CaptureDevice, CpalCapture, CpalPlayback, PlaybackDevice};
pub use config::{AppConfig, ConfigError};
pub use realtime::{RealtimeConnection, RealtimeError, RealtimeModel, RealtimeVoice};
pub use session::{SessionError, VoiceSession};
