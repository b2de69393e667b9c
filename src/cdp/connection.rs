//! CDP WebSocket connection and event loop.
//!
//! One [`Connection`] wraps one duplex transport to the browser's
//! debugger endpoint. A background task owns the socket; callers talk to
//! it through a command channel, and replies are correlated back by call
//! id. Multiple calls may be in flight concurrently; replies may arrive
//! in any order relative to send order.
//!
//! Every pending call settles exactly once, through whichever of these
//! fires first: a matching reply, the per-call timeout, or connection
//! closure. The other two paths become no-ops.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

use super::message::{Call, Envelope, Reply};

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Map of in-flight call ids to their waiters.
type CorrelationMap = FxHashMap<u64, oneshot::Sender<Result<Value>>>;

// ============================================================================
// LoopCommand
// ============================================================================

/// Internal commands for the event loop.
enum LoopCommand {
    /// Register a waiter and write an already-serialized envelope.
    Send {
        id: u64,
        json: String,
        response_tx: oneshot::Sender<Result<Value>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(u64),
    /// Close the socket and stop the loop.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// A live CDP connection.
///
/// Cheap to clone; all clones share the same transport, id counter, and
/// correlation map.
pub struct Connection {
    command_tx: mpsc::UnboundedSender<LoopCommand>,
    correlation: Arc<Mutex<CorrelationMap>>,
    next_id: Arc<AtomicU64>,
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            correlation: Arc::clone(&self.correlation),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl Connection {
    /// Connects to a debugger WebSocket URL.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the handshake does not complete
    ///   within `handshake_timeout`
    /// - [`Error::ConnectionFailed`] on transport-level failure
    pub async fn connect(ws_url: &str, handshake_timeout: Duration) -> Result<Self> {
        debug!(url = ws_url, "Connecting to CDP endpoint");

        let (ws_stream, _) = timeout(handshake_timeout, connect_async(ws_url))
            .await
            .map_err(|_| Error::connection_timeout(handshake_timeout.as_millis() as u64))?
            .map_err(|e| Error::connection_failed(e.to_string()))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&correlation),
        ));

        debug!(url = ws_url, "CDP connection established");

        Ok(Self {
            command_tx,
            correlation,
            // Call ids start at 1 and are never reused within a connection.
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Sends a call and waits for its correlated reply.
    ///
    /// Returns the reply's `result` value (`Value::Null` when absent).
    ///
    /// # Errors
    ///
    /// - [`Error::CallTimeout`] naming the method, if the per-call timer fires
    /// - [`Error::Protocol`] if the browser reports an error for the call
    /// - [`Error::ConnectionClosed`] if the transport closes first
    pub async fn send(&self, call: Call) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let envelope = Envelope {
            id,
            method: &call.method,
            params: call.params.as_ref(),
            session_id: call.session.as_ref().map(|s| s.as_str()),
        };
        let json = serde_json::to_string(&envelope)?;

        trace!(id, method = %call.method, "Sending CDP call");

        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(LoopCommand::Send {
                id,
                json,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        if call.timeout.is_zero() {
            return response_rx.await.map_err(|_| Error::ConnectionClosed)?;
        }

        match timeout(call.timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                // The waiter is removed together with the fired timer, so
                // a late reply for this id is ignored as an unknown id.
                let _ = self.command_tx.send(LoopCommand::RemoveCorrelation(id));

                Err(Error::call_timeout(
                    call.method,
                    call.timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Returns the number of in-flight calls.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Closes the connection.
    ///
    /// All still-pending calls are rejected with
    /// [`Error::ConnectionClosed`] so no caller awaits forever.
    pub fn close(&self) {
        let _ = self.command_tx.send(LoopCommand::Shutdown);
    }

    /// Event loop that owns the WebSocket.
    async fn run_event_loop(
        ws_stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<LoopCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    if !Self::handle_ws_message(message, &correlation) {
                        break;
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(LoopCommand::Send { id, json, response_tx }) => {
                            Self::handle_send(id, json, response_tx, &mut ws_write, &correlation)
                                .await;
                        }

                        Some(LoopCommand::RemoveCorrelation(id)) => {
                            correlation.lock().remove(&id);
                            trace!(id, "Removed timed-out call");
                        }

                        Some(LoopCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        Self::fail_pending(&correlation);

        debug!("CDP event loop terminated");
    }

    /// Handles one inbound frame. Returns `false` when the loop should stop.
    fn handle_ws_message(
        message: Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) -> bool {
        match message {
            Some(Ok(Message::Text(text))) => {
                Self::handle_incoming(text.as_str(), correlation);
                true
            }
            Some(Ok(Message::Close(_))) => {
                debug!("WebSocket closed by browser");
                false
            }
            Some(Err(e)) => {
                warn!(error = %e, "WebSocket error");
                false
            }
            None => {
                debug!("WebSocket stream ended");
                false
            }
            // Ignore Binary, Ping, Pong frames.
            _ => true,
        }
    }

    /// Correlates one inbound text message.
    ///
    /// Malformed messages are dropped; they cannot be correlated and must
    /// not bring the client down. Push notifications and unknown or late
    /// ids are ignored.
    fn handle_incoming(text: &str, correlation: &Arc<Mutex<CorrelationMap>>) {
        let reply: Reply = match serde_json::from_str(text) {
            Ok(reply) => reply,
            Err(e) => {
                trace!(error = %e, "Dropping unparseable CDP message");
                return;
            }
        };

        let Some(id) = reply.id else {
            if reply.is_event() {
                trace!(method = reply.method.as_deref().unwrap_or(""), "Ignoring push notification");
            }
            return;
        };

        let Some(tx) = correlation.lock().remove(&id) else {
            trace!(id, "Reply for unknown or late id, ignoring");
            return;
        };

        let outcome = match reply.error {
            Some(error) => Err(Error::protocol(error.message)),
            None => Ok(reply.result.unwrap_or(Value::Null)),
        };

        let _ = tx.send(outcome);
    }

    /// Registers the waiter, then writes the envelope.
    async fn handle_send(
        id: u64,
        json: String,
        response_tx: oneshot::Sender<Result<Value>>,
        ws_write: &mut WsSink,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) {
        correlation.lock().insert(id, response_tx);

        if let Err(e) = ws_write.send(Message::Text(json.into())).await
            && let Some(tx) = correlation.lock().remove(&id)
        {
            let _ = tx.send(Err(Error::connection_failed(e.to_string())));
        }
    }

    /// Rejects every still-pending call with a closed-connection error.
    fn fail_pending(correlation: &Arc<Mutex<CorrelationMap>>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Rejected pending calls on close");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
