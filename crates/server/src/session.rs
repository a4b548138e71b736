//! Per-connection protocol state machine.
//!
//! ```text
//! AwaitPrefix -> AwaitOperation -> AwaitImage1 -> [AwaitImage2] -> Processing -> Respond
//!      ^                                                                          |
//!      +--------------------------------------------------------------------------+
//! ```
//!
//! A session serves frames until the peer disconnects or something goes
//! wrong. Every failure answers with at most one message and ends the
//! session; the same frame is never retried.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use facewire_protocol::transport::{read_array, read_payload, write_all};
use facewire_protocol::{
    Frame, FrameError, LENGTH_LEN, OPERATION_LEN, Operation, PREFIX_LEN, TransportError,
    decode_length, decode_prefix,
};

use crate::config::ServerConfig;
use crate::detector::{Detection, Detector};
use crate::resource::{ProcessingResource, Request};

/// State shared read-only by every session of one server.
pub struct SessionContext<D> {
    pub config: ServerConfig,
    pub resource: ProcessingResource<D>,
    pub legacy_response: Arc<[u8]>,
}

/// A protocol violation or processing failure reported to the peer.
///
/// The `Display` text is exactly what goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("invalid message")]
    InvalidMessage,

    #[error("invalid operation type")]
    InvalidOperation,

    #[error("image is 0 bytes")]
    EmptyImage,

    #[error("image too large")]
    ImageTooLarge,

    #[error("invalid image")]
    InvalidImage,

    #[error("no faces detected in image")]
    NoFaces,
}

/// Why a session ended.
#[derive(Debug, thiserror::Error)]
pub enum SessionEnd {
    /// The peer closed the connection between frames.
    #[error("peer disconnected")]
    Disconnected,

    /// The peer did not speak this protocol and was sent the legacy blob.
    #[error("legacy peer served")]
    LegacyPeer,

    /// An error message was sent to the peer.
    #[error("rejected: {0}")]
    Rejected(Rejection),

    /// The connection failed; nothing more could be sent.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// The result could not be framed.
    #[error("cannot encode response: {0}")]
    Encode(#[from] FrameError),
}

/// Summary returned when a session finishes.
#[derive(Debug)]
pub struct SessionReport {
    /// Completed request/response exchanges.
    pub exchanges: u64,
    pub end: SessionEnd,
}

/// One client connection.
pub struct Session<D, R, W> {
    reader: R,
    writer: W,
    peer: SocketAddr,
    context: Arc<SessionContext<D>>,
}

impl<D, R, W> Session<D, R, W>
where
    D: Detector,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, peer: SocketAddr, context: Arc<SessionContext<D>>) -> Self {
        Self {
            reader,
            writer,
            peer,
            context,
        }
    }

    /// Serves frames until the session reaches a terminal state.
    pub async fn run(mut self) -> SessionReport {
        let mut exchanges = 0;
        let end = loop {
            match self.exchange().await {
                Ok(()) => exchanges += 1,
                Err(end) => break end,
            }
        };

        let peer = self.peer;
        match &end {
            SessionEnd::Disconnected => info!(%peer, exchanges, "session closed by peer"),
            SessionEnd::LegacyPeer => info!(%peer, "non-protocol peer sent legacy response"),
            SessionEnd::Rejected(rejection) => {
                warn!(%peer, exchanges, %rejection, "session rejected")
            }
            SessionEnd::Transport(e) => debug!(%peer, exchanges, "session transport ended: {e}"),
            SessionEnd::Encode(e) => warn!(%peer, exchanges, "cannot encode response: {e}"),
        }

        SessionReport { exchanges, end }
    }

    /// Runs one request/response cycle.
    async fn exchange(&mut self) -> Result<(), SessionEnd> {
        // AwaitPrefix
        let prefix = match read_array::<PREFIX_LEN, _>(&mut self.reader).await {
            Ok(bytes) => bytes,
            Err(e) if e.at_field_boundary() => return Err(SessionEnd::Disconnected),
            Err(_) => return Err(self.reject(Rejection::InvalidMessage).await),
        };
        if decode_prefix(prefix).is_err() {
            return Err(self.serve_legacy().await);
        }

        // AwaitOperation
        let operation = match read_array::<OPERATION_LEN, _>(&mut self.reader).await {
            Ok([byte]) => byte,
            Err(_) => return Err(self.reject(Rejection::InvalidMessage).await),
        };
        let operation = match Operation::try_from(operation) {
            Ok(op) if op.is_request() => op,
            _ => return Err(self.reject(Rejection::InvalidOperation).await),
        };

        // AwaitImage1 / AwaitImage2
        let image = self.read_image().await?;
        let request = match operation {
            Operation::Replace => Request::Replace {
                target: image,
                source: self.read_image().await?,
            },
            _ => Request::Detect(image),
        };
        debug!(peer = %self.peer, %operation, "request received");

        // Processing
        let output = match self.context.resource.process(request).await {
            Ok(Detection::Found(output)) => output,
            Ok(Detection::NoFaces) => return Err(self.reject(Rejection::NoFaces).await),
            Ok(Detection::Invalid) => return Err(self.reject(Rejection::InvalidImage).await),
            Err(e) => {
                tracing::error!(peer = %self.peer, "{e}");
                return Err(self.reject(Rejection::InvalidImage).await);
            }
        };

        // Respond
        let bytes = Frame::output(output).encode()?;
        write_all(&mut self.writer, &bytes).await?;
        debug!(peer = %self.peer, len = bytes.len(), "output sent");
        Ok(())
    }

    /// Reads one length-prefixed image, validating the length before reading the body.
    async fn read_image(&mut self) -> Result<Vec<u8>, SessionEnd> {
        let len = match read_array::<LENGTH_LEN, _>(&mut self.reader).await {
            Ok(bytes) => decode_length(bytes),
            Err(_) => return Err(self.reject(Rejection::InvalidMessage).await),
        };
        if len == 0 {
            return Err(self.reject(Rejection::EmptyImage).await);
        }
        if len > self.context.config.max_image_size {
            return Err(self.reject(Rejection::ImageTooLarge).await);
        }
        match read_payload(&mut self.reader, len).await {
            Ok(image) => Ok(image),
            Err(_) => Err(self.reject(Rejection::InvalidMessage).await),
        }
    }

    /// Sends an error message and returns the resulting end state.
    async fn reject(&mut self, rejection: Rejection) -> SessionEnd {
        let frame = Frame::error_message(&rejection.to_string());
        let result = match frame.encode() {
            Ok(bytes) => write_all(&mut self.writer, &bytes).await,
            Err(e) => return SessionEnd::Encode(e),
        };
        match result {
            Ok(()) => SessionEnd::Rejected(rejection),
            Err(e) => SessionEnd::Transport(e),
        }
    }

    async fn serve_legacy(&mut self) -> SessionEnd {
        let blob = Arc::clone(&self.context.legacy_response);
        match write_all(&mut self.writer, &blob).await {
            Ok(()) => SessionEnd::LegacyPeer,
            Err(e) => SessionEnd::Transport(e),
        }
    }
}
