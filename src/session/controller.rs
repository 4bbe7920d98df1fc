//! Session controller.
//!
//! Connects, configures the session, starts the capture streamer and the
//! event dispatcher (the player is started lazily by the dispatcher on the
//! first audio delta), and guarantees that every loop reaches a terminal
//! state before `run` returns: whichever loop ends first (dispatcher on
//! connection close or fatal error, capture on device failure) triggers
//! cancellation of the other, then the devices are released and the
//! connection closed. Device `close` is idempotent, so release on the error
//! path and release on drop cannot double-fault.

use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::audio::{CaptureDevice, PlaybackDevice};
use crate::realtime::{EventSender, RealtimeConnection, RealtimeError, RealtimeOptions, ServerEvent};

use super::dispatcher::EventDispatcher;
use super::{SessionError, SessionResult, capture};

/// One voice conversation, spanning the process lifetime.
pub struct VoiceSession {
    options: RealtimeOptions,
    capture: Arc<dyn CaptureDevice>,
    playback: Arc<dyn PlaybackDevice>,
}

impl VoiceSession {
    pub fn new(
        options: RealtimeOptions,
        capture: Arc<dyn CaptureDevice>,
        playback: Arc<dyn PlaybackDevice>,
    ) -> Self {
        Self {
            options,
            capture,
            playback,
        }
    }

    /// Run the conversation until the connection closes or a loop fails.
    ///
    /// # Errors
    ///
    /// Connection establishment failures are returned without retry; device
    /// and protocol failures end the session and are returned after
    /// teardown completes.
    pub async fn run(self) -> SessionResult<()> {
        let mut connection = RealtimeConnection::connect(&self.options).await?;
        let events = connection
            .take_events()
            .ok_or(RealtimeError::NotConnected)?;
        let sender = connection.sender();

        println!("Ready - start talking (Ctrl-C to quit)");

        let result = run_loops(
            events,
            sender,
            self.capture,
            self.playback,
            Box::new(io::stdout()),
        )
        .await;

        connection.close();
        result
    }
}

/// Drive the capture streamer and event dispatcher to completion, then
/// release the devices. Factored out of [`VoiceSession::run`] so the whole
/// pipeline can be exercised over raw channels.
async fn run_loops(
    events: mpsc::Receiver<ServerEvent>,
    sender: EventSender,
    capture_device: Arc<dyn CaptureDevice>,
    playback_device: Arc<dyn PlaybackDevice>,
    transcript: Box<dyn io::Write + Send>,
) -> SessionResult<()> {
    let cancel = CancellationToken::new();

    let mut capture_task = tokio::spawn(capture::run(
        Arc::clone(&capture_device),
        sender.clone(),
        cancel.clone(),
    ));

    let dispatcher = EventDispatcher::new(sender, Arc::clone(&playback_device), transcript);
    let dispatch = dispatcher.run(events);
    tokio::pin!(dispatch);

    let result = tokio::select! {
        result = &mut dispatch => {
            // Dispatcher ended (connection closed or fatal error): stop the
            // capture streamer and wait for its cancellation to complete
            cancel.cancel();
            if let Err(e) = (&mut capture_task).await {
                tracing::error!(error = %e, "capture task did not shut down cleanly");
            }
            result
        }
        capture_result = &mut capture_task => {
            // Capture died first: a device failure is fatal to the session
            cancel.cancel();
            match capture_result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(SessionError::Task(e.to_string())),
            }
        }
    };

    capture_device.close();
    playback_device.close();
    result
}

// =============================================================================
// Tests
// =============================================================================
