//! Error types for the wire codec and transport.

/// Errors produced while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("bad prefix: 0x{found:08x}")]
    BadPrefix { found: u32 },

    #[error("unknown operation: {0}")]
    UnknownOperation(u8),

    #[error("frame truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("{0} trailing bytes after frame")]
    TrailingBytes(usize),

    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("replace frame requires a second image")]
    MissingSecondary,

    #[error("only replace frames carry a second image")]
    UnexpectedSecondary,
}

/// Errors produced by the socket transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the stream before any byte of an `expected`-byte field.
    #[error("connection closed before a {expected}-byte field")]
    Closed { expected: usize },

    /// The read failed before any byte of the field arrived.
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    /// The stream ended or failed partway through an `expected`-byte field.
    #[error("{expected}-byte field cut short: {source}")]
    Truncated {
        expected: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("write failed: {0}")]
    WriteFailed(#[source] std::io::Error),
}

impl TransportError {
    /// Returns `true` when the stream ended between fields, with nothing of
    /// the requested field received.
    pub fn at_field_boundary(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::Read(_))
    }
}
