//! Event dispatcher: the single receive loop of a session.
//!
//! Consumes inbound [`ServerEvent`]s strictly in arrival order and drives
//! everything downstream: transcript output, the playback buffer and player
//! lifecycle, and the barge-in sequence. Barge-in (the server reporting that
//! the user started speaking over the assistant) must be low latency and
//! must not leave stale audio queued: the buffer is stopped and cleared in
//! one atomic step, the player task is waited on with a bound so the path
//! can never hang, and exactly one `response.cancel` aborts the in-flight
//! response.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::audio::{FRAME_BYTES, PlaybackDevice};
use crate::realtime::{ClientEvent, EventSender, RealtimeError, ServerEvent};

use super::playback::{self, PlaybackBuffer};
use super::{SessionError, SessionResult};

/// Bound on waiting for the player task to observe the stop signal during
/// barge-in. Expiry is a degraded path, not an error: playback state is
/// already clean, so the dispatcher aborts the task and moves on.
const PLAYER_STOP_TIMEOUT: Duration = Duration::from_millis(500);

/// Transcript formatting state for the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    /// Next transcript fragment opens a new turn
    AwaitingTurnStart,
    /// Fragments continue the current turn
    InTurn,
}

/// The receive loop of one session.
pub struct EventDispatcher {
    sender: EventSender,
    device: Arc<dyn PlaybackDevice>,
    transcript: Box<dyn Write + Send>,
    buffer: PlaybackBuffer,
    player: Option<JoinHandle<()>>,
    turn: TurnState,
    frame_bytes: usize,
}

impl EventDispatcher {
    pub fn new(
        sender: EventSender,
        device: Arc<dyn PlaybackDevice>,
        transcript: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            sender,
            device,
            transcript,
            buffer: PlaybackBuffer::new(),
            player: None,
            turn: TurnState::AwaitingTurnStart,
            frame_bytes: FRAME_BYTES,
        }
    }

    /// Process inbound events until the connection ends or a fatal error.
    ///
    /// A terminating inbound channel means the connection closed (clean
    /// exit). Malformed payloads and send failures are fatal; unknown event
    /// types are ignored.
    pub async fn run(mut self, mut events: mpsc::Receiver<ServerEvent>) -> SessionResult<()> {
        let result = loop {
            match events.recv().await {
                Some(event) => {
                    if let Err(e) = self.handle(event).await {
                        tracing::error!(error = %e, "event dispatch failed");
                        break Err(e);
                    }
                }
                None => {
                    tracing::info!("connection closed");
                    break Ok(());
                }
            }
        };

        self.stop_player().await;
        result
    }

    async fn handle(&mut self, event: ServerEvent) -> SessionResult<()> {
        match event {
            ServerEvent::AudioTranscriptDelta { delta } => {
                if self.turn == TurnState::AwaitingTurnStart {
                    write!(self.transcript, "\nAI: ")?;
                    self.turn = TurnState::InTurn;
                }
                write!(self.transcript, "{delta}")?;
                self.transcript.flush()?;
            }

            ServerEvent::AudioDelta { delta } => {
                let pcm = ServerEvent::decode_audio_delta(&delta)
                    .map_err(|e| RealtimeError::ProtocolError(format!("audio delta: {e}")))?;
                self.buffer.extend(&pcm);
                self.ensure_player();
            }

            ServerEvent::SpeechStarted => {
                tracing::debug!("speech started");
                self.barge_in().await?;
            }

            ServerEvent::SpeechStopped => {
                tracing::debug!("speech stopped");
            }

            ServerEvent::TranscriptionCompleted { transcript } => {
                let text = transcript.trim_end();
                if !text.is_empty() {
                    writeln!(self.transcript, "\nYou: {text}")?;
                    self.transcript.flush()?;
                }
            }

            ServerEvent::ResponseDone => {
                if self.turn == TurnState::InTurn {
                    writeln!(self.transcript)?;
                    self.transcript.flush()?;
                    self.turn = TurnState::AwaitingTurnStart;
                }
                tracing::debug!("response done");
            }

            ServerEvent::Error { error } => {
                // Server-reported errors are advisory; only transport
                // failures end the session
                tracing::warn!(
                    error_type = %error.error_type,
                    code = ?error.code,
                    "server error: {}",
                    error.message
                );
            }

            ServerEvent::SessionCreated { session } => {
                tracing::info!(session_id = %session.id, "session created");
            }

            ServerEvent::SessionUpdated { session } => {
                tracing::debug!(session_id = %session.id, "session configured");
            }

            ServerEvent::Unknown => {
                tracing::trace!("ignoring unhandled server event");
            }
        }

        Ok(())
    }

    /// Start a player task if none is running.
    fn ensure_player(&mut self) {
        let active = self.player.as_ref().is_some_and(|p| !p.is_finished());
        if !active {
            self.buffer.resume();
            self.player = Some(tokio::spawn(playback::drain(
                self.buffer.clone(),
                Arc::clone(&self.device),
                self.frame_bytes,
            )));
        }
    }

    /// Interrupt playback and cancel the in-flight response.
    ///
    /// The stop flag stays raised until the next audio delta resumes the
    /// buffer, so audio appended while the interruption is still settling
    /// cannot reach the device.
    async fn barge_in(&mut self) -> SessionResult<()> {
        self.turn = TurnState::AwaitingTurnStart;

        let discarded = self.buffer.stop_and_clear();
        if discarded > 0 {
            tracing::debug!(discarded_bytes = discarded, "playback buffer flushed");
        }

        if let Some(mut player) = self.player.take() {
            if !player.is_finished()
                && timeout(PLAYER_STOP_TIMEOUT, &mut player).await.is_err()
            {
                tracing::warn!(
                    timeout_ms = PLAYER_STOP_TIMEOUT.as_millis() as u64,
                    "player did not observe stop signal in time; aborting"
                );
                player.abort();
            }
        }

        self.sender.send(ClientEvent::ResponseCancel).await?;
        Ok(())
    }

    /// Stop any running player at the end of the session. Audio still
    /// buffered when the connection ends is discarded.
    async fn stop_player(&mut self) {
        self.buffer.stop_and_clear();
        if let Some(mut player) = self.player.take() {
            if !player.is_finished()
                && timeout(PLAYER_STOP_TIMEOUT, &mut player).await.is_err()
            {
                player.abort();
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
