//! Local audio device access.
//!
//! This module owns the capture (microphone) and playback (speaker) side of
//! the client. The format is fixed end to end: PCM 16-bit signed
//! little-endian, mono, 24 kHz, moved in 1024-sample frames. The remote
//! service produces and consumes the same format, so no resampling or
//! channel mapping happens anywhere in the pipeline.

mod devices;

pub use devices::{CpalCapture, CpalPlayback};

use thiserror::Error;

/// Sample rate for both capture and playback (matches the remote service).
pub const SAMPLE_RATE: u32 = 24_000;

/// Channel count; everything in this client is mono.
pub const CHANNELS: u16 = 1;

/// Samples per frame read from the capture device or written to playback.
pub const FRAME_SAMPLES: usize = 1024;

/// Bytes per PCM16 sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Bytes per frame (1024 samples of PCM16).
pub const FRAME_BYTES: usize = FRAME_SAMPLES * BYTES_PER_SAMPLE;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by the audio device layer.
#[derive(Debug, Error)]
pub enum AudioError {
    /// No usable device, or the device rejected the fixed stream config
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The underlying stream failed after it was opened
    #[error("audio stream error: {0}")]
    Stream(String),

    /// I/O was attempted on a closed device
    #[error("audio device closed")]
    Closed,
}

/// Result type for audio device operations.
pub type AudioResult<T> = Result<T, AudioError>;

// =============================================================================
// Device Traits
// =============================================================================

/// Blocking source of fixed-size capture frames.
///
/// `read_frame` blocks the calling thread until a full frame is available,
/// so callers on an async runtime must run it on the blocking pool.
pub trait CaptureDevice: Send + Sync {
    /// Read exactly one frame ([`FRAME_BYTES`] bytes of PCM16), blocking
    /// until enough samples have been captured.
    fn read_frame(&self) -> AudioResult<bytes::Bytes>;

    /// Release the device. Idempotent; a blocked `read_frame` returns
    /// [`AudioError::Closed`] once this is called.
    fn close(&self);
}

/// Blocking sink for playback audio.
pub trait PlaybackDevice: Send + Sync {
    /// Queue PCM16 bytes for playback, blocking while the device buffer is
    /// full. Slices shorter than a full frame are accepted.
    fn write(&self, pcm: &[u8]) -> AudioResult<()>;

    /// Release the device. Idempotent.
    fn close(&self);
}

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory devices for exercising the streaming pipeline without
    //! audio hardware.

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use parking_lot::{Condvar, Mutex};

    use super::{AudioError, AudioResult, CaptureDevice, PlaybackDevice};

    /// Capture device that yields a scripted sequence of frames, then
    /// blocks until closed.
    pub struct ScriptedCapture {
        frames: Mutex<Vec<Bytes>>,
        reads: AtomicUsize,
        closed: Mutex<bool>,
        cond: Condvar,
    }

    impl ScriptedCapture {
        pub fn new(frames: Vec<Vec<u8>>) -> Arc<Self> {
            Arc::new(Self {
                frames: Mutex::new(frames.into_iter().map(Bytes::from).collect()),
                reads: AtomicUsize::new(0),
                closed: Mutex::new(false),
                cond: Condvar::new(),
            })
        }

        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl CaptureDevice for ScriptedCapture {
        fn read_frame(&self) -> AudioResult<Bytes> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            {
                let mut frames = self.frames.lock();
                if !frames.is_empty() {
                    return Ok(frames.remove(0));
                }
            }
            // Script exhausted: behave like a silent microphone until closed
            let mut closed = self.closed.lock();
            while !*closed {
                self.cond.wait(&mut closed);
            }
            Err(AudioError::Closed)
        }

        fn close(&self) {
            *self.closed.lock() = true;
            self.cond.notify_all();
        }
    }

    /// Playback device that records every write.
    #[derive(Default)]
    pub struct RecordingPlayback {
        writes: Mutex<Vec<Vec<u8>>>,
        closes: AtomicUsize,
    }

    impl RecordingPlayback {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Every write, in order.
        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.writes.lock().clone()
        }

        /// All written bytes concatenated.
        pub fn written(&self) -> Vec<u8> {
            self.writes.lock().concat()
        }

        pub fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    impl PlaybackDevice for RecordingPlayback {
        fn write(&self, pcm: &[u8]) -> AudioResult<()> {
            self.writes.lock().push(pcm.to_vec());
            Ok(())
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Playback device whose writes never return, for exercising the
    /// bounded barge-in wait against a wedged player.
    #[derive(Default)]
    pub struct StuckPlayback {
        gate: Mutex<()>,
        cond: Condvar,
    }

    impl StuckPlayback {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }
    }

    impl PlaybackDevice for StuckPlayback {
        fn write(&self, _pcm: &[u8]) -> AudioResult<()> {
            let mut gate = self.gate.lock();
            loop {
                self.cond.wait(&mut gate);
            }
        }

        fn close(&self) {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constants() {
        assert_eq!(FRAME_BYTES, 2048);
        assert_eq!(SAMPLE_RATE, 24_000);
        assert_eq!(CHANNELS, 1);
    }

    #[test]
    fn test_error_display() {
        let err = AudioError::DeviceUnavailable("no input device".to_string());
        assert!(err.to_string().contains("no input device"));
        assert_eq!(AudioError::Closed.to_string(), "audio device closed");
    }
}
