//! cpal-backed capture and playback devices.
//!
//! `cpal::Stream` is neither `Send` nor `Sync`, so each stream lives on a
//! dedicated OS thread for the lifetime of the device and the handles only
//! share a condvar-guarded sample ring with the stream callbacks. That keeps
//! the handles `Send + Sync` and the blocking `read_frame` / `write` calls
//! usable from the async runtime's blocking pool.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;

use bytes::Bytes;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use parking_lot::{Condvar, Mutex};

use super::{AudioError, AudioResult, CHANNELS, FRAME_SAMPLES, SAMPLE_RATE};
use super::{CaptureDevice, PlaybackDevice};

/// Upper bound on buffered capture samples (10 s). If the reader stalls the
/// oldest audio is dropped rather than growing without bound.
const CAPTURE_BACKLOG_SAMPLES: usize = SAMPLE_RATE as usize * 10;

/// Playback ring high-water mark; writers block above this to keep device
/// latency bounded while the session-level buffer absorbs the rest.
const PLAYBACK_HIGH_WATER_SAMPLES: usize = FRAME_SAMPLES * 8;

// =============================================================================
// Shared Ring State
// =============================================================================

struct RingState {
    samples: VecDeque<i16>,
    closed: bool,
    failed: Option<String>,
}

struct Ring {
    state: Mutex<RingState>,
    cond: Condvar,
}

impl Ring {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RingState {
                samples: VecDeque::new(),
                closed: false,
                failed: None,
            }),
            cond: Condvar::new(),
        })
    }

    /// Mark the ring closed and wake every blocked reader/writer.
    fn close(&self) {
        self.state.lock().closed = true;
        self.cond.notify_all();
    }

    /// Record a stream failure and wake every blocked reader/writer.
    fn fail(&self, message: String) {
        let mut state = self.state.lock();
        if state.failed.is_none() {
            state.failed = Some(message);
        }
        self.cond.notify_all();
    }

    /// Park the calling thread until the ring is closed. Used by the stream
    /// threads to keep their `cpal::Stream` alive.
    fn wait_closed(&self) {
        let mut state = self.state.lock();
        while !state.closed {
            self.cond.wait(&mut state);
        }
    }
}

// =============================================================================
// Capture
// =============================================================================

/// Microphone capture on the default cpal input device.
pub struct CpalCapture {
    ring: Arc<Ring>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl CpalCapture {
    /// Open the default input device at the fixed mono/24 kHz config and
    /// start capturing.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::DeviceUnavailable`] if no input device exists
    /// or none supports the required configuration.
    pub fn open() -> AudioResult<Self> {
        let ring = Ring::new();
        let stream_ring = Arc::clone(&ring);
        let (ready_tx, ready_rx) = mpsc::channel::<AudioResult<()>>();

        let thread = std::thread::Builder::new()
            .name("capture-stream".to_string())
            .spawn(move || {
                let stream = match build_input_stream(&stream_ring) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Hold the stream on this thread until close()
                stream_ring.wait_closed();
                drop(stream);
                tracing::debug!("audio capture stopped");
            })
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(AudioError::DeviceUnavailable(
                    "capture stream thread exited during startup".to_string(),
                ));
            }
        }

        Ok(Self {
            ring,
            thread: Mutex::new(Some(thread)),
        })
    }
}

impl CaptureDevice for CpalCapture {
    fn read_frame(&self) -> AudioResult<Bytes> {
        let mut state = self.ring.state.lock();
        loop {
            if let Some(ref message) = state.failed {
                return Err(AudioError::Stream(message.clone()));
            }
            if state.closed {
                return Err(AudioError::Closed);
            }
            if state.samples.len() >= FRAME_SAMPLES {
                let mut frame = Vec::with_capacity(FRAME_SAMPLES * 2);
                for sample in state.samples.drain(..FRAME_SAMPLES) {
                    frame.extend_from_slice(&sample.to_le_bytes());
                }
                return Ok(Bytes::from(frame));
            }
            self.ring.cond.wait(&mut state);
        }
    }

    fn close(&self) {
        self.ring.close();
        if let Some(thread) = self.thread.lock().take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_input_stream(ring: &Arc<Ring>) -> AudioResult<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::DeviceUnavailable("no input device available".to_string()))?;

    let supported_config = device
        .supported_input_configs()
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?
        .find(|c| {
            c.channels() == CHANNELS
                && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
        })
        .ok_or_else(|| {
            AudioError::DeviceUnavailable("no suitable capture config found".to_string())
        })?;

    let config: StreamConfig = supported_config.with_sample_rate(SampleRate(SAMPLE_RATE)).config();

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = SAMPLE_RATE,
        channels = config.channels,
        "audio capture initialized"
    );

    let data_ring = Arc::clone(ring);
    let error_ring = Arc::clone(ring);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mut state = data_ring.state.lock();
                for &sample in data {
                    #[allow(clippy::cast_possible_truncation)]
                    let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                    state.samples.push_back(sample_i16);
                }
                let excess = state.samples.len().saturating_sub(CAPTURE_BACKLOG_SAMPLES);
                if excess > 0 {
                    state.samples.drain(..excess);
                }
                drop(state);
                data_ring.cond.notify_all();
            },
            move |err| {
                tracing::error!(error = %err, "audio capture error");
                error_ring.fail(err.to_string());
            },
            None,
        )
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

    stream.play().map_err(|e| AudioError::Stream(e.to_string()))?;
    tracing::debug!("audio capture started");
    Ok(stream)
}

// =============================================================================
// Playback
// =============================================================================

/// Speaker playback on the default cpal output device.
pub struct CpalPlayback {
    ring: Arc<Ring>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl CpalPlayback {
    /// Open the default output device at 24 kHz (mono, or stereo with the
    /// mono signal duplicated) and start the output stream.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::DeviceUnavailable`] if no output device exists
    /// or none supports the required configuration.
    pub fn open() -> AudioResult<Self> {
        let ring = Ring::new();
        let stream_ring = Arc::clone(&ring);
        let (ready_tx, ready_rx) = mpsc::channel::<AudioResult<()>>();

        let thread = std::thread::Builder::new()
            .name("playback-stream".to_string())
            .spawn(move || {
                let stream = match build_output_stream(&stream_ring) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                stream_ring.wait_closed();
                drop(stream);
                tracing::debug!("audio playback stopped");
            })
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(AudioError::DeviceUnavailable(
                    "playback stream thread exited during startup".to_string(),
                ));
            }
        }

        Ok(Self {
            ring,
            thread: Mutex::new(Some(thread)),
        })
    }
}

impl PlaybackDevice for CpalPlayback {
    fn write(&self, pcm: &[u8]) -> AudioResult<()> {
        let mut state = self.ring.state.lock();
        loop {
            if let Some(ref message) = state.failed {
                return Err(AudioError::Stream(message.clone()));
            }
            if state.closed {
                return Err(AudioError::Closed);
            }
            if state.samples.len() <= PLAYBACK_HIGH_WATER_SAMPLES {
                break;
            }
            self.ring.cond.wait(&mut state);
        }
        for chunk in pcm.chunks_exact(2) {
            state.samples.push_back(i16::from_le_bytes([chunk[0], chunk[1]]));
        }
        Ok(())
    }

    fn close(&self) {
        self.ring.close();
        if let Some(thread) = self.thread.lock().take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CpalPlayback {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_output_stream(ring: &Arc<Ring>) -> AudioResult<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::DeviceUnavailable("no output device available".to_string()))?;

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?
        .find(|c| {
            c.channels() == CHANNELS
                && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
        })
        .or_else(|| {
            // Fallback: stereo output with the mono signal duplicated
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
        })
        .ok_or_else(|| {
            AudioError::DeviceUnavailable("no suitable playback config found".to_string())
        })?;

    let config: StreamConfig = supported_config.with_sample_rate(SampleRate(SAMPLE_RATE)).config();
    let channels = config.channels as usize;

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = SAMPLE_RATE,
        channels = config.channels,
        "audio playback initialized"
    );

    let data_ring = Arc::clone(ring);
    let error_ring = Arc::clone(ring);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut state = data_ring.state.lock();
                for frame in data.chunks_mut(channels) {
                    // Underruns play silence
                    let sample = state
                        .samples
                        .pop_front()
                        .map_or(0.0, |s| f32::from(s) / 32768.0);
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
                drop(state);
                data_ring.cond.notify_all();
            },
            move |err| {
                tracing::error!(error = %err, "audio playback error");
                error_ring.fail(err.to_string());
            },
            None,
        )
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

    stream.play().map_err(|e| AudioError::Stream(e.to_string()))?;
    tracing::debug!("audio playback started");
    Ok(stream)
}
