//! Client error taxonomy and exit statuses.

use std::path::PathBuf;

/// Usage line printed for malformed command lines.
pub const USAGE: &str = "Usage: facewire-client port [--detectfilename filename] \
                         [--outputfilename filename] [--replacefile filename]";

/// Terminal client failures. `Display` is the line printed on stderr.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{}", USAGE)]
    Usage,

    #[error("facewire-client: cannot open the input file \"{}\" for reading", path.display())]
    InputFile { path: PathBuf },

    #[error("facewire-client: unable to open the output file \"{}\" for writing", path.display())]
    OutputFile { path: PathBuf },

    #[error("facewire-client: cannot connect to the server on port \"{port}\"")]
    Connect { port: String },

    #[error("facewire-client: unexpected communication error")]
    Communication { detail: String },

    #[error("facewire-client: received the following error message: \"{message}\"")]
    Server { message: String },
}

impl ClientError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage => 17,
            Self::InputFile { .. } => 20,
            Self::OutputFile { .. } => 9,
            Self::Connect { .. } => 4,
            Self::Communication { .. } => 18,
            Self::Server { .. } => 12,
        }
    }

    pub(crate) fn communication(detail: impl std::fmt::Display) -> Self {
        Self::Communication {
            detail: detail.to_string(),
        }
    }
}

impl From<facewire_protocol::TransportError> for ClientError {
    fn from(e: facewire_protocol::TransportError) -> Self {
        Self::communication(e)
    }
}
