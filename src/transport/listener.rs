//! WebSocket listener and admission.
//!
//! # Connection Flow
//!
//! 1. Client opens `ws://HOST:PORT/ws?userId=<id>`
//! 2. The upgrade request is checked: path must be `/ws`, `userId` must be
//!    a usable identity. Otherwise the upgrade is refused (404 / 403)
//! 3. The upgraded stream becomes a [`WsConnection`]
//! 4. A participant is enqueued in the waiting pool

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::result::Result as StdResult;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{StatusCode, Uri};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::ParticipantId;
use crate::matchmaking::{Participant, WaitingPool};

use super::WsConnection;

// ============================================================================
// Constants
// ============================================================================

/// Path clients connect to.
pub const WS_PATH: &str = "/ws";

/// Query parameter carrying the identity.
pub const IDENTITY_PARAM: &str = "userId";

// ============================================================================
// Admission
// ============================================================================

/// Extracts the identity from an upgrade URI.
///
/// # Errors
///
/// Returns [`Error::Admission`] if the path is wrong or the `userId`
/// parameter is missing, empty or a placeholder.
pub fn identity_from_uri(uri: &Uri) -> Result<ParticipantId> {
    if uri.path() != WS_PATH {
        return Err(Error::admission(format!("unknown path: {}", uri.path())));
    }

    let raw = uri
        .query()
        .and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == IDENTITY_PARAM)
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_default();

    ParticipantId::parse(raw)
}

/// Builds the HTTP refusal for a failed admission.
///
/// The body stays empty; the cause is only logged.
fn refusal(uri: &Uri) -> ErrorResponse {
    let mut response = ErrorResponse::new(None);
    *response.status_mut() = if uri.path() == WS_PATH {
        StatusCode::FORBIDDEN
    } else {
        StatusCode::NOT_FOUND
    };
    response
}

// ============================================================================
// Listener
// ============================================================================

/// Bound TCP listener that admits WebSocket clients into a pool.
pub struct Listener {
    listener: TcpListener,
    local_addr: SocketAddr,
    handshake_timeout: Duration,
}

impl Listener {
    /// Binds to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(addr: SocketAddr, handshake_timeout: Duration) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "WebSocket listener bound");

        Ok(Self {
            listener,
            local_addr,
            handshake_timeout,
        })
    }

    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections into `pool` until `shutdown` turns `true`.
    pub async fn run(self, pool: Arc<WaitingPool>, mut shutdown: watch::Receiver<bool>) {
        debug!("Accept loop started");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let pool = Arc::clone(&pool);
                        let handshake_timeout = self.handshake_timeout;
                        tokio::spawn(async move {
                            match admit(stream, addr, pool, handshake_timeout).await {
                                Err(e) if e.is_per_connection() => {
                                    debug!(error = %e, ?addr, "Connection refused");
                                }
                                Err(e) => warn!(error = %e, ?addr, "Admission failed"),
                                Ok(()) => {}
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                },

                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
                    debug!("Accept loop shutting down");
                    break;
                }
            }
        }

        debug!("Accept loop terminated");
    }
}

/// Upgrades one TCP connection and enqueues its participant.
async fn admit(
    stream: TcpStream,
    addr: SocketAddr,
    pool: Arc<WaitingPool>,
    handshake_timeout: Duration,
) -> Result<()> {
    debug!(?addr, "New TCP connection");

    let mut admitted: Option<ParticipantId> = None;
    let mut refused: Option<Error> = None;

    let callback = |request: &Request, response: Response| -> StdResult<Response, ErrorResponse> {
        match identity_from_uri(request.uri()) {
            Ok(id) => {
                admitted = Some(id);
                Ok(response)
            }
            Err(e) => {
                let rejection = refusal(request.uri());
                refused = Some(e);
                Err(rejection)
            }
        }
    };

    let upgrade = timeout(handshake_timeout, accept_hdr_async(stream, callback))
        .await
        .map_err(|_| Error::connection_timeout(handshake_timeout.as_millis() as u64))?;

    if let Some(e) = refused {
        return Err(e);
    }

    let ws_stream =
        upgrade.map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;
    let id = admitted.ok_or_else(|| Error::admission("identity missing after upgrade"))?;

    let participant = Participant::new(id, Arc::new(WsConnection::new(ws_stream)));

    info!(
        participant = %participant.id(),
        connection = %participant.connection_id(),
        ?addr,
        "Connection established"
    );

    pool.enqueue(participant);
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
