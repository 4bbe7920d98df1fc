//! Session orchestration.
//!
//! One [`VoiceSession`] spans the process lifetime: it establishes and
//! configures the Realtime connection, then runs the concurrent loops of
//! the pipeline (capture streamer, event dispatcher, playback player) and
//! tears all of them down when either the connection or the capture
//! device gives out. There is exactly one active conversation per process;
//! nothing is persisted.

mod capture;
mod controller;
mod dispatcher;
mod playback;

pub use controller::VoiceSession;
pub use dispatcher::EventDispatcher;
pub use playback::{FramePull, PlaybackBuffer};

use thiserror::Error;

use crate::audio::AudioError;
use crate::realtime::RealtimeError;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Connection-layer failure
    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    /// Audio device failure
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Transcript output failure
    #[error("transcript output error: {0}")]
    Io(#[from] std::io::Error),

    /// A worker task died
    #[error("task failed: {0}")]
    Task(String),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
