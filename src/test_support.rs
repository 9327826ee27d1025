//! In-memory connection double for unit tests.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, mpsc, watch};
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::identifiers::ParticipantId;
use crate::matchmaking::Participant;
use crate::protocol::Envelope;
use crate::transport::ConnectionHandle;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for any wait in a test.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// MockConnection
// ============================================================================

/// Scriptable [`ConnectionHandle`].
///
/// Inbound frames are pushed by the test; outbound frames are recorded.
pub(crate) struct MockConnection {
    inbound_tx: mpsc::UnboundedSender<Result<Envelope>>,
    inbound_rx: AsyncMutex<mpsc::UnboundedReceiver<Result<Envelope>>>,
    sent: Mutex<Vec<Envelope>>,
    sent_count: watch::Sender<usize>,
    probe_ok: AtomicBool,
    probes: AtomicUsize,
    closed: watch::Sender<bool>,
}

impl MockConnection {
    pub(crate) fn new() -> Arc<Self> {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            inbound_tx,
            inbound_rx: AsyncMutex::new(inbound_rx),
            sent: Mutex::new(Vec::new()),
            sent_count: watch::channel(0).0,
            probe_ok: AtomicBool::new(true),
            probes: AtomicUsize::new(0),
            closed: watch::channel(false).0,
        })
    }

    /// Creates a participant backed by a fresh mock.
    pub(crate) fn participant(name: &str) -> (Participant, Arc<Self>) {
        let mock = Self::new();
        let id = ParticipantId::parse(name).expect("valid test identity");
        (Participant::new(id, mock.clone()), mock)
    }

    /// Queues an inbound frame.
    pub(crate) fn push(&self, value: Value) {
        let envelope = Envelope::from_serialize(&value).expect("object frame");
        let _ = self.inbound_tx.send(Ok(envelope));
    }

    /// Makes the next read fail as if the peer vanished.
    pub(crate) fn fail_read(&self) {
        let _ = self.inbound_tx.send(Err(Error::connection("connection reset")));
    }

    /// Makes every later probe fail.
    pub(crate) fn fail_probes(&self) {
        self.probe_ok.store(false, Ordering::SeqCst);
    }

    pub(crate) fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().clone()
    }

    /// Waits until at least `count` frames were sent and returns all of them.
    pub(crate) async fn wait_sent(&self, count: usize) -> Vec<Envelope> {
        let mut rx = self.sent_count.subscribe();
        timeout(WAIT_TIMEOUT, rx.wait_for(|sent| *sent >= count))
            .await
            .expect("frames in time")
            .expect("watch alive");
        self.sent()
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[async_trait]
impl ConnectionHandle for MockConnection {
    async fn send(&self, envelope: Envelope) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        self.sent.lock().push(envelope);
        self.sent_count.send_modify(|count| *count += 1);
        Ok(())
    }

    async fn recv(&self) -> Result<Envelope> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let mut closed_rx = self.closed.subscribe();
        let mut inbound = self.inbound_rx.lock().await;

        tokio::select! {
            frame = inbound.recv() => frame.unwrap_or(Err(Error::ConnectionClosed)),
            _ = async { let _ = closed_rx.wait_for(|closed| *closed).await; } => {
                Err(Error::ConnectionClosed)
            }
        }
    }

    async fn probe(&self, deadline: Duration) -> Result<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() || !self.probe_ok.load(Ordering::SeqCst) {
            return Err(Error::connection_timeout(deadline.as_millis() as u64));
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }

    fn is_closed(&self) -> bool {
        MockConnection::is_closed(self)
    }
}
