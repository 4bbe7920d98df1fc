//! Playback buffering and the player loop.
//!
//! Inbound audio deltas are appended to a [`PlaybackBuffer`] by the event
//! dispatcher and drained in fixed-size frames by a player task that writes
//! them to the playback device. The buffer holds the stop flag and the byte
//! queue under one lock: [`PlaybackBuffer::next_frame`] checks the flag and
//! drains in a single atomic step, so once [`PlaybackBuffer::stop_and_clear`]
//! returns, no player can pull a byte that was queued before the stop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::audio::PlaybackDevice;

/// How long the player sleeps when the buffer is empty.
const IDLE_POLL: Duration = Duration::from_millis(10);

// =============================================================================
// Playback Buffer
// =============================================================================

/// One frame-pull from the buffer.
#[derive(Debug)]
pub enum FramePull {
    /// Up to one frame of audio, shorter for the trailing slice
    Frame(Bytes),
    /// Nothing buffered right now
    Empty,
    /// The stop flag is raised; the player must exit
    Stopped,
}

#[derive(Default)]
struct BufferState {
    queue: VecDeque<u8>,
    stopped: bool,
}

/// Byte queue of audio awaiting playback, shared between the dispatcher
/// (appends, interrupts) and the player task (drains).
#[derive(Clone, Default)]
pub struct PlaybackBuffer {
    inner: Arc<Mutex<BufferState>>,
}

impl PlaybackBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decoded audio at the tail.
    pub fn extend(&self, pcm: &[u8]) {
        self.inner.lock().queue.extend(pcm);
    }

    /// Bytes currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raise the stop flag and discard everything queued, atomically.
    /// Returns the number of bytes discarded.
    pub fn stop_and_clear(&self) -> usize {
        let mut state = self.inner.lock();
        state.stopped = true;
        let discarded = state.queue.len();
        state.queue.clear();
        discarded
    }

    /// Lower the stop flag so a new player can run.
    pub fn resume(&self) {
        self.inner.lock().stopped = false;
    }

    /// Atomically check the stop flag and drain up to `max_bytes` from the
    /// head. The final trailing slice may be shorter than a full frame.
    pub fn next_frame(&self, max_bytes: usize) -> FramePull {
        let mut state = self.inner.lock();
        if state.stopped {
            return FramePull::Stopped;
        }
        if state.queue.is_empty() {
            return FramePull::Empty;
        }
        let take = state.queue.len().min(max_bytes);
        let frame: Vec<u8> = state.queue.drain(..take).collect();
        FramePull::Frame(Bytes::from(frame))
    }
}

// =============================================================================
// Player Loop
// =============================================================================

/// Drain the buffer into the playback device until stopped or the device
/// fails. Frames are written in FIFO order, each exactly once; the blocking
/// device write runs on the blocking pool; the loop yields every iteration
/// and sleeps briefly when the buffer is empty rather than spinning.
pub async fn drain(buffer: PlaybackBuffer, device: Arc<dyn PlaybackDevice>, frame_bytes: usize) {
    loop {
        match buffer.next_frame(frame_bytes) {
            FramePull::Stopped => {
                tracing::debug!("player observed stop signal");
                break;
            }
            FramePull::Frame(frame) => {
                let device = Arc::clone(&device);
                match tokio::task::spawn_blocking(move || device.write(&frame)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::error!(error = %e, "playback write failed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "playback worker failed");
                        break;
                    }
                }
                tokio::task::yield_now().await;
            }
            FramePull::Empty => {
                tokio::time::sleep(IDLE_POLL).await;
                tokio::task::yield_now().await;
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::RecordingPlayback;

    #[test]
    fn test_fifo_frames_with_trailing_slice() {
        let buffer = PlaybackBuffer::new();
        buffer.extend(b"AAAABBBBCC");

        match buffer.next_frame(4) {
            FramePull::Frame(f) => assert_eq!(&f[..], b"AAAA"),
            other => panic!("expected frame, got {other:?}"),
        }
        match buffer.next_frame(4) {
            FramePull::Frame(f) => assert_eq!(&f[..], b"BBBB"),
            other => panic!("expected frame, got {other:?}"),
        }
        // Trailing slice is shorter than a full frame
        match buffer.next_frame(4) {
            FramePull::Frame(f) => assert_eq!(&f[..], b"CC"),
            other => panic!("expected frame, got {other:?}"),
        }
        assert!(matches!(buffer.next_frame(4), FramePull::Empty));
    }

    #[test]
    fn test_stop_and_clear_is_atomic_with_drain() {
        let buffer = PlaybackBuffer::new();
        buffer.extend(b"AAAABBBB");

        let discarded = buffer.stop_and_clear();
        assert_eq!(discarded, 8);
        assert!(buffer.is_empty());

        // Even freshly appended bytes are unreachable while stopped
        buffer.extend(b"CCCC");
        assert!(matches!(buffer.next_frame(4), FramePull::Stopped));

        buffer.resume();
        match buffer.next_frame(4) {
            FramePull::Frame(f) => assert_eq!(&f[..], b"CCCC"),
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_drain_writes_in_order() {
        let buffer = PlaybackBuffer::new();
        let device = RecordingPlayback::new();
        buffer.extend(b"AAAA");
        buffer.extend(b"BBBB");

        let writer: Arc<dyn PlaybackDevice> = device.clone();
        let player = tokio::spawn(drain(buffer.clone(), writer, 4));

        // Wait until both frames landed, then stop the idle loop
        while device.writes().len() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        buffer.stop_and_clear();
        player.await.unwrap();

        assert_eq!(device.writes(), vec![b"AAAA".to_vec(), b"BBBB".to_vec()]);
    }

    #[tokio::test]
    async fn test_drain_exits_immediately_when_stopped() {
        let buffer = PlaybackBuffer::new();
        let device = RecordingPlayback::new();
        buffer.extend(b"AAAA");
        buffer.stop_and_clear();

        let writer: Arc<dyn PlaybackDevice> = device.clone();
        drain(buffer, writer, 4).await;
        assert!(device.writes().is_empty());
    }
}
