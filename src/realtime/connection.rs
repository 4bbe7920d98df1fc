//! WebSocket connection to the Realtime API.
//!
//! [`RealtimeConnection::connect`] establishes the transport, sends the one
//! `session.update` handshake, and spawns a single connection task that owns
//! both halves of the split socket: it forwards outbound [`ClientEvent`]s
//! from an mpsc channel and parses inbound text frames into [`ServerEvent`]s
//! delivered on another channel. The inbound channel terminating is the
//! signal that the connection is gone, whether the server closed it or the
//! transport failed.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

use super::config::RealtimeOptions;
use super::events::{ClientEvent, ServerEvent, SessionConfig};
use super::{RealtimeError, RealtimeResult};

/// Channel capacity for outbound and inbound event queues.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Event Sender
// =============================================================================

/// Cloneable handle for sending [`ClientEvent`]s over the connection.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<ClientEvent>,
}

impl EventSender {
    pub(crate) fn new(tx: mpsc::Sender<ClientEvent>) -> Self {
        Self { tx }
    }

    /// Queue an event for transmission.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::NotConnected`] once the connection task has
    /// ended.
    pub async fn send(&self, event: ClientEvent) -> RealtimeResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }
}

// =============================================================================
// Connection
// =============================================================================

/// A live connection to the Realtime API.
pub struct RealtimeConnection {
    sender: EventSender,
    events: Option<mpsc::Receiver<ServerEvent>>,
    task: Option<JoinHandle<()>>,
}

impl RealtimeConnection {
    /// Connect, then configure the session before any audio is streamed.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::AuthenticationFailed`] for a missing API
    /// key and [`RealtimeError::ConnectionFailed`] when the transport
    /// cannot be established. Establishment is not retried.
    pub async fn connect(options: &RealtimeOptions) -> RealtimeResult<Self> {
        if options.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let endpoint = Url::parse(&options.endpoint)
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;
        let host = endpoint
            .host_str()
            .ok_or_else(|| {
                RealtimeError::InvalidConfiguration("endpoint has no host".to_string())
            })?
            .to_string();

        let url = format!("{}?model={}", options.endpoint, options.model.as_str());

        let request = http::Request::builder()
            .uri(&url)
            .header("Authorization", format!("Bearer {}", options.api_key))
            .header("OpenAI-Beta", "realtime=v1")
            .header("Sec-WebSocket-Protocol", "realtime")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        tracing::info!(model = %options.model, voice = %options.voice, "connected to Realtime API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<ClientEvent>(EVENT_CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel::<ServerEvent>(EVENT_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Outgoing events
                    Some(event) = out_rx.recv() => {
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!(error = %e, "failed to serialize event");
                                continue;
                            }
                        };

                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!(error = %e, "failed to send WebSocket message");
                            break;
                        }
                    }

                    // Incoming frames
                    Some(message) = ws_stream.next() => {
                        match message {
                            Ok(Message::Text(text)) => {
                                match serde_json::from_str::<ServerEvent>(&text) {
                                    Ok(event) => {
                                        if in_tx.send(event).await.is_err() {
                                            // Receiver gone - session is tearing down
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        // Malformed payload: fail fast rather than
                                        // risk acting on a partial message
                                        tracing::error!(error = %e, "malformed server event");
                                        break;
                                    }
                                }
                            }
                            Ok(Message::Close(_)) => {
                                tracing::info!("WebSocket closed by server");
                                break;
                            }
                            Ok(Message::Ping(data)) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!(error = %e, "failed to send pong");
                                }
                            }
                            Ok(_) => {}
                            Err(e) => {
                                tracing::error!(error = %e, "WebSocket error");
                                break;
                            }
                        }
                    }

                    else => break,
                }
            }

            tracing::debug!("realtime connection task ended");
        });

        let connection = Self {
            sender: EventSender::new(out_tx),
            events: Some(in_rx),
            task: Some(task),
        };

        // Session configuration must precede any audio
        connection
            .sender
            .send(ClientEvent::SessionUpdate {
                session: SessionConfig::from_options(options),
            })
            .await?;

        Ok(connection)
    }

    /// Handle for sending events over this connection.
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Take the inbound event stream. Yields `None` once the connection
    /// task ends. Can only be taken once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ServerEvent>> {
        self.events.take()
    }

    /// Tear down the connection task. Idempotent.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("realtime connection closed");
        }
    }
}

impl Drop for RealtimeConnection {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Tests
// =============================================================================
