//! Wire protocol for the facewire image service.
//!
//! A client submits one image (detect) or two images (replace) in a single
//! frame and receives exactly one frame back: the processed image or an
//! error text.
//!
//! # Wire format
//!
//! See [`codec`] for the frame layout and [`transport`] for the exact-length
//! socket reads and writes the codec relies on.

pub mod codec;
pub mod error;
pub mod resolve;
pub mod transport;

pub use codec::{
    Frame, MAGIC_PREFIX, Operation, decode_frame, decode_header, decode_length, decode_prefix,
    encode_frame, encode_length,
};
pub use error::{FrameError, TransportError};
pub use resolve::resolve;

/// Size of the magic prefix field.
pub const PREFIX_LEN: usize = 4;

/// Size of the operation field.
pub const OPERATION_LEN: usize = 1;

/// Size of each payload length field.
pub const LENGTH_LEN: usize = 4;

/// Prefix plus operation byte.
pub const HEADER_LEN: usize = PREFIX_LEN + OPERATION_LEN;

/// Upper bound on a single read buffer while collecting a payload (64 KB).
///
/// Payload buffers grow by at most this much per read, so a declared length
/// only costs memory once the bytes have actually arrived.
pub const PAYLOAD_CHUNK_SIZE: usize = 64 * 1024;
