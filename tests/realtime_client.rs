//! Integration tests for the Realtime voice client
//!
//! These tests verify:
//! - Configuration resolution and validation
//! - Wire event shapes against the remote contract
//! - Playback buffer invariants through the public API
//!
//! Note: Tests requiring actual API calls are marked with #[ignore]
//! and require OPENAI_API_KEY environment variable.

use voicechat::realtime::{
    AUDIO_FORMAT, ClientEvent, REALTIME_SAMPLE_RATE, REALTIME_URL, RealtimeConnection,
    RealtimeError, RealtimeModel, RealtimeOptions, RealtimeVoice, ServerEvent, SessionConfig,
};
use voicechat::session::{FramePull, PlaybackBuffer};

/// Test constants fixed by the remote contract
#[test]
fn test_realtime_constants() {
    assert_eq!(REALTIME_URL, "wss://api.openai.com/v1/realtime");
    assert_eq!(REALTIME_SAMPLE_RATE, 24_000);
    assert_eq!(AUDIO_FORMAT, "pcm16");
    assert_eq!(voicechat::audio::FRAME_SAMPLES, 1024);
    assert_eq!(voicechat::audio::FRAME_BYTES, 2048);
}

/// Test model parsing falls back to the default
#[test]
fn test_model_parse_or_default() {
    assert_eq!(
        RealtimeModel::from_str_or_default("gpt-4o-mini-realtime-preview"),
        RealtimeModel::Gpt4oMiniRealtimePreview
    );
    assert_eq!(
        RealtimeModel::from_str_or_default("invalid"),
        RealtimeModel::Gpt4oRealtimePreview
    );
}

/// Test voice parsing is case-insensitive with fallback
#[test]
fn test_voice_parse_or_default() {
    for voice in RealtimeVoice::all() {
        assert_eq!(
            RealtimeVoice::from_str_or_default(voice.as_str()),
            *voice,
            "Voice {voice} mapping failed"
        );
    }
    assert_eq!(
        RealtimeVoice::from_str_or_default("Shimmer"),
        RealtimeVoice::Shimmer
    );
    assert_eq!(
        RealtimeVoice::from_str_or_default("invalid"),
        RealtimeVoice::Alloy
    );
}

/// Test the session.update handshake matches the wire contract field for field
#[test]
fn test_session_update_wire_shape() {
    let options = RealtimeOptions {
        api_key: "test-key".to_string(),
        voice: RealtimeVoice::Coral,
        instructions: "Keep responses brief.".to_string(),
        ..Default::default()
    };
    let event = ClientEvent::SessionUpdate {
        session: SessionConfig::from_options(&options),
    };
    let json = serde_json::to_value(&event).unwrap();

    assert_eq!(json["type"], "session.update");
    let session = &json["session"];
    assert_eq!(session["modalities"], serde_json::json!(["text", "audio"]));
    assert_eq!(session["instructions"], "Keep responses brief.");
    assert_eq!(session["voice"], "coral");
    assert_eq!(session["input_audio_format"], "pcm16");
    assert_eq!(session["output_audio_format"], "pcm16");
    assert_eq!(session["input_audio_transcription"]["model"], "whisper-1");
}

/// Test the audio append event shape
#[test]
fn test_audio_append_wire_shape() {
    let event = ClientEvent::audio_append(&[0u8, 1, 2, 3]);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "input_audio_buffer.append");
    assert_eq!(json["audio"], "AAECAw==");
}

/// Test the response cancel event shape
#[test]
fn test_response_cancel_wire_shape() {
    let json = serde_json::to_string(&ClientEvent::ResponseCancel).unwrap();
    assert_eq!(json, r#"{"type":"response.cancel"}"#);
}

/// Test inbound events parse from their minimal wire shapes
#[test]
fn test_inbound_wire_shapes() {
    let event: ServerEvent =
        serde_json::from_str(r#"{"type":"response.audio_transcript.delta","delta":"Hi"}"#).unwrap();
    assert!(matches!(event, ServerEvent::AudioTranscriptDelta { .. }));

    let event: ServerEvent =
        serde_json::from_str(r#"{"type":"response.audio.delta","delta":"AAECAw=="}"#).unwrap();
    assert!(matches!(event, ServerEvent::AudioDelta { .. }));

    let event: ServerEvent =
        serde_json::from_str(r#"{"type":"input_audio_buffer.speech_started"}"#).unwrap();
    assert!(matches!(event, ServerEvent::SpeechStarted));

    // Forward compatibility: unknown types are ignored, not errors
    let event: ServerEvent =
        serde_json::from_str(r#"{"type":"response.content_part.added","part":{}}"#).unwrap();
    assert!(matches!(event, ServerEvent::Unknown));
}

/// Test connection refuses to start without an API key
#[tokio::test]
async fn test_connect_requires_api_key() {
    let options = RealtimeOptions::default();
    match RealtimeConnection::connect(&options).await {
        Err(RealtimeError::AuthenticationFailed(msg)) => {
            assert!(msg.contains("API key is required"));
        }
        _ => panic!("Expected AuthenticationFailed error"),
    }
}

/// Test playback buffer FIFO and atomic interruption via the public API
#[test]
fn test_playback_buffer_invariants() {
    let buffer = PlaybackBuffer::new();
    assert!(buffer.is_empty());

    buffer.extend(b"AAAABBBBCC");
    assert_eq!(buffer.len(), 10);

    match buffer.next_frame(4) {
        FramePull::Frame(frame) => assert_eq!(&frame[..], b"AAAA"),
        other => panic!("expected frame, got {other:?}"),
    }

    let discarded = buffer.stop_and_clear();
    assert_eq!(discarded, 6);
    assert!(buffer.is_empty());
    assert!(matches!(buffer.next_frame(4), FramePull::Stopped));

    buffer.resume();
    assert!(matches!(buffer.next_frame(4), FramePull::Empty));
}

/// Test the buffer is usable from a one-off async context
#[test]
fn test_buffer_usable_from_blocking_context() {
    let buffer = PlaybackBuffer::new();
    buffer.extend(b"ABCD");
    // tokio_test provides a throwaway runtime for one-off async assertions
    tokio_test::block_on(async {
        match buffer.next_frame(4) {
            FramePull::Frame(frame) => assert_eq!(&frame[..], b"ABCD"),
            other => panic!("expected frame, got {other:?}"),
        }
    });
}

/// Integration test with real API (requires OPENAI_API_KEY)
#[tokio::test]
#[ignore = "Requires OPENAI_API_KEY environment variable"]
async fn test_real_connection_and_handshake() {
    use tokio::time::{Duration, timeout};

    rustls::crypto::ring::default_provider()
        .install_default()
        .ok();

    let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
    let options = RealtimeOptions {
        api_key,
        instructions: "You are a helpful assistant. Keep responses brief.".to_string(),
        ..Default::default()
    };

    let mut connection = timeout(Duration::from_secs(10), RealtimeConnection::connect(&options))
        .await
        .expect("connection timed out")
        .expect("connection failed");

    let mut events = connection.take_events().unwrap();

    // The server acknowledges the session before anything else
    let first = timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("no server event received");
    match first {
        Some(ServerEvent::SessionCreated { session }) => {
            assert!(!session.id.is_empty());
        }
        other => panic!("expected session.created, got {other:?}"),
    }

    connection.close();
}
