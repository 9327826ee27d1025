//! WebSocket connection and writer loop.
//!
//! A connection is split at creation: the sink is moved into a spawned writer
//! task driven by a command channel, the stream stays behind a lock and is
//! read on demand by whoever owns the participant (nobody while waiting, the
//! session's relay once paired).
//!
//! # Writer Loop
//!
//! The writer task handles:
//!
//! - Outgoing JSON frames from the lobby and the relay
//! - Liveness probes (ws `Ping`)
//! - Local close, signalled through a shared watch flag
//!
//! Every write reports its result back over a oneshot, so a failed write is
//! visible to the caller and marks the connection closed for everyone.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::Envelope;

// ============================================================================
// ConnectionHandle
// ============================================================================

/// One participant's bidirectional message channel.
///
/// The waiting pool, the pairer and the session only ever see this trait,
/// so tests can substitute an in-memory connection.
#[async_trait]
pub trait ConnectionHandle: Send + Sync + 'static {
    /// Writes one frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the connection is closed, or
    /// the underlying write error.
    async fn send(&self, envelope: Envelope) -> Result<()>;

    /// Reads the next frame.
    ///
    /// Only one reader is expected at a time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] when the peer or the lobby closed
    /// the connection, or [`Error::Protocol`] for an undecodable frame.
    async fn recv(&self) -> Result<Envelope>;

    /// Writes a liveness probe, bounded by `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionTimeout`] if the write does not finish in
    /// time, or any write error.
    async fn probe(&self, deadline: Duration) -> Result<()>;

    /// Closes the connection. Idempotent.
    fn close(&self);

    /// Returns `true` once the connection is closed.
    fn is_closed(&self) -> bool;
}

// ============================================================================
// WriterCommand
// ============================================================================

/// Internal commands for the writer loop.
enum WriterCommand {
    /// Write a text frame.
    Send {
        text: String,
        done: oneshot::Sender<Result<()>>,
    },
    /// Write a ping frame.
    Ping { done: oneshot::Sender<Result<()>> },
}

// ============================================================================
// WsConnection
// ============================================================================

/// WebSocket-backed [`ConnectionHandle`].
///
/// # Thread Safety
///
/// `WsConnection` is `Send + Sync` and is shared as
/// `Arc<dyn ConnectionHandle>`. Writes from several tasks are serialized by
/// the writer loop, so a frame is never interleaved with another.
pub struct WsConnection<S = TcpStream> {
    /// Channel into the writer loop.
    command_tx: mpsc::UnboundedSender<WriterCommand>,
    /// Read half.
    reader: AsyncMutex<SplitStream<WebSocketStream<S>>>,
    /// Closed flag shared with the writer loop.
    closed: Arc<watch::Sender<bool>>,
}

impl<S> WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Creates a connection from an upgraded stream.
    ///
    /// Spawns the writer loop internally.
    pub fn new(ws_stream: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws_stream.split();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        let closed = Arc::new(closed);

        tokio::spawn(Self::run_writer_loop(sink, command_rx, Arc::clone(&closed)));

        Self {
            command_tx,
            reader: AsyncMutex::new(stream),
            closed,
        }
    }

    /// Hands a command to the writer loop and waits for its result.
    async fn submit(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<()>>) -> WriterCommand,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let (done, done_rx) = oneshot::channel();
        self.command_tx
            .send(command(done))
            .map_err(|_| Error::ConnectionClosed)?;

        done_rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Marks the connection closed and returns `error`.
    fn fail(&self, error: Error) -> Error {
        self.closed.send_replace(true);
        error
    }

    /// Writer loop that owns the sink.
    async fn run_writer_loop(
        mut sink: SplitSink<WebSocketStream<S>, Message>,
        mut command_rx: mpsc::UnboundedReceiver<WriterCommand>,
        closed: Arc<watch::Sender<bool>>,
    ) {
        let mut closed_rx = closed.subscribe();

        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    let (message, done) = match command {
                        Some(WriterCommand::Send { text, done }) => (Message::Text(text.into()), done),
                        Some(WriterCommand::Ping { done }) => (Message::Ping(Default::default()), done),
                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    };

                    let result = sink.send(message).await.map_err(Error::from);
                    let failed = result.is_err();

                    if let Err(e) = &result {
                        warn!(error = %e, "WebSocket write failed");
                    }

                    let _ = done.send(result);

                    if failed {
                        break;
                    }
                    trace!("Frame written");
                }

                _ = async { let _ = closed_rx.wait_for(|closed| *closed).await; } => {
                    debug!("Close requested");
                    break;
                }
            }
        }

        closed.send_replace(true);
        let _ = sink.close().await;

        debug!("Writer loop terminated");
    }
}

#[async_trait]
impl<S> ConnectionHandle for WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&self, envelope: Envelope) -> Result<()> {
        let text = envelope.to_text()?;
        self.submit(|done| WriterCommand::Send { text, done }).await
    }

    async fn recv(&self) -> Result<Envelope> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let mut closed_rx = self.closed.subscribe();
        let mut reader = self.reader.lock().await;

        loop {
            let message = tokio::select! {
                message = reader.next() => message,
                _ = async { let _ = closed_rx.wait_for(|closed| *closed).await; } => {
                    return Err(Error::ConnectionClosed);
                }
            };

            let parsed = match message {
                Some(Ok(Message::Text(text))) => Envelope::parse(text.as_str()),
                Some(Ok(Message::Binary(bytes))) => Envelope::parse_slice(&bytes),

                Some(Ok(Message::Close(_))) | None => {
                    debug!("WebSocket closed by remote");
                    return Err(self.fail(Error::ConnectionClosed));
                }

                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket read failed");
                    return Err(self.fail(Error::from(e)));
                }

                // Ping, Pong, raw frames
                Some(Ok(_)) => continue,
            };

            return parsed.map_err(|e| Error::protocol(format!("Undecodable frame: {e}")));
        }
    }

    async fn probe(&self, deadline: Duration) -> Result<()> {
        match timeout(deadline, self.submit(|done| WriterCommand::Ping { done })).await {
            Ok(result) => result,
            Err(_) => Err(self.fail(Error::connection_timeout(deadline.as_millis() as u64))),
        }
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::io::{DuplexStream, duplex};
    use tokio_tungstenite::tungstenite::protocol::Role;

    async fn pair() -> (WsConnection<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (server_io, client_io) = duplex(64 * 1024);
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        (WsConnection::new(server), client)
    }

    fn require_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_writer_loop_is_send() {
        let (server_io, _client_io) = duplex(1024);
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let (sink, _stream) = server.split();
        let (_command_tx, command_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(watch::channel(false).0);

        let writer = WsConnection::<DuplexStream>::run_writer_loop(sink, command_rx, closed);
        require_send(&writer);
    }

    #[tokio::test]
    async fn test_send_reaches_peer() {
        let (connection, mut client) = pair().await;
        let envelope = Envelope::from_serialize(&json!({"type": "CHAT", "text": "hi"})).expect("envelope");

        connection.send(envelope.clone()).await.expect("send");

        let message = client.next().await.expect("frame").expect("ok");
        let received = Envelope::parse(message.to_text().expect("text")).expect("json");
        assert_eq!(received, envelope);
    }

    #[tokio::test]
    async fn test_recv_text_and_binary() {
        let (connection, mut client) = pair().await;

        client
            .send(Message::Text(r#"{"type":"CHAT"}"#.into()))
            .await
            .expect("send text");
        client
            .send(Message::Binary(br#"{"type":"MOVE","move":"e2e4"}"#.to_vec().into()))
            .await
            .expect("send binary");

        assert_eq!(connection.recv().await.expect("text").kind(), Some("CHAT"));
        assert_eq!(connection.recv().await.expect("binary").kind(), Some("MOVE"));
    }

    #[tokio::test]
    async fn test_recv_undecodable_frame() {
        let (connection, mut client) = pair().await;
        client.send(Message::Text("not json".into())).await.expect("send");

        let err = connection.recv().await.expect_err("undecodable");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_probe_writes_ping() {
        let (connection, mut client) = pair().await;

        connection.probe(Duration::from_secs(1)).await.expect("probe");

        let message = client.next().await.expect("frame").expect("ok");
        assert!(message.is_ping());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_fails_io() {
        let (connection, _client) = pair().await;

        connection.close();
        connection.close();

        assert!(connection.is_closed());
        assert!(matches!(
            connection.send(Envelope::default()).await,
            Err(Error::ConnectionClosed)
        ));
        assert!(matches!(connection.recv().await, Err(Error::ConnectionClosed)));
        assert!(connection.probe(Duration::from_millis(100)).await.is_err());
    }

    #[tokio::test]
    async fn test_peer_close_detected() {
        let (connection, mut client) = pair().await;
        client.close(None).await.expect("close");

        assert!(connection.recv().await.is_err());
        assert!(connection.is_closed());
    }
}
