//! Capture streamer: microphone frames to outbound append events.
//!
//! One loop, one producer: each iteration performs a blocking device read of
//! exactly one frame on the blocking pool, forwards it as an
//! `input_audio_buffer.append` event, and yields. Capture order is therefore
//! send order. The loop runs until cancelled or until a read fails; a device
//! failure is fatal to the session, not retried.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::audio::CaptureDevice;
use crate::realtime::{ClientEvent, EventSender};

use super::{SessionError, SessionResult};

/// Stream capture frames until `cancel` fires or the device fails.
pub async fn run(
    device: Arc<dyn CaptureDevice>,
    sender: EventSender,
    cancel: CancellationToken,
) -> SessionResult<()> {
    loop {
        let reader = Arc::clone(&device);
        let read = tokio::task::spawn_blocking(move || reader.read_frame());

        tokio::select! {
            () = cancel.cancelled() => {
                // An in-flight blocking read unblocks when the device closes
                tracing::debug!("capture streamer cancelled");
                return Ok(());
            }
            frame = read => {
                let frame = frame.map_err(|e| SessionError::Task(e.to_string()))??;
                sender.send(ClientEvent::audio_append(&frame)).await?;
                tokio::task::yield_now().await;
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
