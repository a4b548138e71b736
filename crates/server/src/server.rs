//! Concurrent TCP server.
//!
//! Binds the configured port with the client limit as listen backlog, then
//! spawns one detached task per accepted connection. Sessions only share
//! the configuration, the legacy blob and the processing resource.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpSocket};
use tokio_util::sync::CancellationToken;

use facewire_protocol::resolve;

use crate::ServerError;
use crate::config::ServerConfig;
use crate::detector::Detector;
use crate::resource::ProcessingResource;
use crate::session::{Session, SessionContext};

/// Pause after a failed accept before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A bound server, ready to accept connections.
pub struct FaceServer<D> {
    listener: TcpListener,
    local_addr: SocketAddr,
    context: Arc<SessionContext<D>>,
    cancel: CancellationToken,
    next_session: AtomicU64,
}

impl<D: Detector> FaceServer<D> {
    /// Binds and listens on the configured host and port.
    ///
    /// Nothing is accepted until [`run`](Self::run) is called.
    pub async fn bind(
        config: ServerConfig,
        detector: D,
        legacy_response: Arc<[u8]>,
    ) -> Result<Self, ServerError> {
        let listen_err = |source: std::io::Error| ServerError::Listen {
            port: config.port.clone(),
            source,
        };

        let resolve_err = |source: std::io::Error| ServerError::Resolve {
            port: config.port.clone(),
            source,
        };

        let addr = resolve(&config.bind_host, &config.port)
            .await
            .map_err(resolve_err)?
            .into_iter()
            .min_by_key(|addr| !addr.is_ipv4())
            .ok_or_else(|| {
                resolve_err(std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("{} did not resolve", config.bind_host),
                ))
            })?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(listen_err)?;
        socket.set_reuseaddr(true).map_err(listen_err)?;
        socket.bind(addr).map_err(listen_err)?;
        let listener = socket.listen(config.client_limit).map_err(listen_err)?;
        let local_addr = listener.local_addr().map_err(listen_err)?;

        tracing::debug!(%local_addr, backlog = config.client_limit, "listener bound");

        Ok(Self {
            listener,
            local_addr,
            context: Arc::new(SessionContext {
                config,
                resource: ProcessingResource::new(detector),
                legacy_response,
            }),
            cancel: CancellationToken::new(),
            next_session: AtomicU64::new(1),
        })
    }

    /// Returns the address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the bound port (the OS-chosen one for port `"0"`).
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns a token that stops the accept loop when cancelled.
    ///
    /// Sessions already running are left to finish on their own.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Accepts connections until the shutdown token is cancelled.
    ///
    /// A failed accept (for example, out of file descriptors) is logged and
    /// retried after [`ACCEPT_BACKOFF`].
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!(
            local_addr = %self.local_addr,
            max_image_size = self.context.config.max_image_size,
            "face server listening"
        );
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("face server shutting down");
                    break Ok(());
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => self.spawn_session(stream, peer),
                        Err(e) => accept_failed(&e).await,
                    }
                }
            }
        }
    }

    fn spawn_session(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        tracing::info!(session = id, %peer, "connection accepted");

        let context = Arc::clone(&self.context);
        tokio::spawn(async move {
            let (reader, writer) = stream.into_split();
            let report = Session::new(BufReader::new(reader), writer, peer, context)
                .run()
                .await;
            tracing::debug!(session = id, exchanges = report.exchanges, "session finished");
        });
    }
}

/// Logs a failed accept and waits before the next one.
///
/// Errors such as `EMFILE` persist until some session closes.
async fn accept_failed(e: &std::io::Error) {
    tracing::error!("accept error: {e}");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}
