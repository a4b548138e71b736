//! Command-line client for the facewire image protocol.
//!
//! Sends one detect or replace request to a server on `localhost` and writes
//! the returned image to a file or standard output.

pub mod args;
pub mod driver;
pub mod error;

pub use args::ClientArgs;
pub use driver::{FaceClient, build_request, run, write_output};
pub use error::{ClientError, USAGE};
