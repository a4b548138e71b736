//! Concurrent TCP server for the facewire image protocol.
//!
//! Every accepted connection runs its own [`Session`] task. Sessions share an
//! immutable [`ServerConfig`], the legacy-fallback blob, and a single
//! [`ProcessingResource`] that serialises calls into the [`Detector`].

pub mod config;
pub mod detector;
pub mod resource;
pub mod server;
pub mod session;

pub use config::{ConfigError, ServerConfig, Settings};
pub use detector::{Detection, Detector, ImageFormat, SniffingDetector};
pub use resource::{ProcessingError, ProcessingResource, Request};
pub use server::FaceServer;
pub use session::{Rejection, Session, SessionContext, SessionEnd, SessionReport};

/// Errors that stop the server before it starts accepting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("cannot resolve port {port:?}: {source}")]
    Resolve {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot listen on port {port:?}: {source}")]
    Listen {
        port: String,
        #[source]
        source: std::io::Error,
    },
}

impl ServerError {
    /// The port string the operator asked for.
    pub fn port(&self) -> &str {
        match self {
            Self::Resolve { port, .. } | Self::Listen { port, .. } => port,
        }
    }
}
