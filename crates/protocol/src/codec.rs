//! Frame encoding and decoding.
//!
//! # Wire format
//!
//! ```text
//! [4 bytes LE: prefix = 0x23107231]
//! [1 byte: operation  0=detect 1=replace 2=output 3=error message]
//! [4 bytes LE: len1]
//! [len1 bytes: payload1]
//!
//! REPLACE ONLY:
//!   [4 bytes LE: len2]
//!   [len2 bytes: payload2]
//! ```
//!
//! Every integer is little-endian regardless of host. Older peers wrote
//! native-order integers; on the little-endian hosts they ran on, that is
//! the same byte layout.
//!
//! The codec is pure. It never validates a payload length against a size
//! limit; the acceptable bound is a deployment setting owned by the server.

use crate::error::FrameError;
use crate::{HEADER_LEN, LENGTH_LEN, PREFIX_LEN};

/// Magic value every frame starts with.
pub const MAGIC_PREFIX: u32 = 0x2310_7231;

/// Frame operation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    /// Client asks for faces in one image to be annotated.
    Detect = 0,
    /// Client asks for faces in the target image to be replaced by the source.
    Replace = 1,
    /// Server returns the processed image.
    Output = 2,
    /// Server returns a UTF-8 error text.
    ErrorMessage = 3,
}

impl Operation {
    /// Valid on a client-to-server frame.
    pub fn is_request(self) -> bool {
        matches!(self, Self::Detect | Self::Replace)
    }

    /// Valid on a server-to-client frame.
    pub fn is_response(self) -> bool {
        matches!(self, Self::Output | Self::ErrorMessage)
    }

    /// Number of length-prefixed payloads that follow the header.
    pub fn payload_count(self) -> usize {
        match self {
            Self::Replace => 2,
            _ => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Detect => "detect",
            Self::Replace => "replace",
            Self::Output => "output",
            Self::ErrorMessage => "error_message",
        }
    }
}

impl TryFrom<u8> for Operation {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Detect),
            1 => Ok(Self::Replace),
            2 => Ok(Self::Output),
            3 => Ok(Self::ErrorMessage),
            other => Err(FrameError::UnknownOperation(other)),
        }
    }
}

impl From<Operation> for u8 {
    fn from(op: Operation) -> Self {
        op as u8
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One complete protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub operation: Operation,
    /// First payload: the image, the target image, or the error text.
    pub primary: Vec<u8>,
    /// Second payload, present iff `operation` is [`Operation::Replace`].
    pub secondary: Option<Vec<u8>>,
}

impl Frame {
    pub fn detect(image: Vec<u8>) -> Self {
        Self {
            operation: Operation::Detect,
            primary: image,
            secondary: None,
        }
    }

    pub fn replace(target: Vec<u8>, source: Vec<u8>) -> Self {
        Self {
            operation: Operation::Replace,
            primary: target,
            secondary: Some(source),
        }
    }

    pub fn output(image: Vec<u8>) -> Self {
        Self {
            operation: Operation::Output,
            primary: image,
            secondary: None,
        }
    }

    pub fn error_message(text: &str) -> Self {
        Self {
            operation: Operation::ErrorMessage,
            primary: text.as_bytes().to_vec(),
            secondary: None,
        }
    }

    /// Encodes the frame into its wire representation.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        encode_frame(self.operation, &self.primary, self.secondary.as_deref())
    }

    /// Total encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + LENGTH_LEN
            + self.primary.len()
            + self
                .secondary
                .as_ref()
                .map_or(0, |s| LENGTH_LEN + s.len())
    }

    /// The primary payload read as text (lossy), for error message frames.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.primary).into_owned()
    }
}

/// Encodes a payload length field.
pub fn encode_length(len: u32) -> [u8; LENGTH_LEN] {
    len.to_le_bytes()
}

/// Decodes a payload length field. No semantic validation happens here.
pub fn decode_length(bytes: [u8; LENGTH_LEN]) -> u32 {
    u32::from_le_bytes(bytes)
}

/// Checks a 4-byte prefix against [`MAGIC_PREFIX`].
pub fn decode_prefix(bytes: [u8; PREFIX_LEN]) -> Result<u32, FrameError> {
    let prefix = u32::from_le_bytes(bytes);
    if prefix != MAGIC_PREFIX {
        return Err(FrameError::BadPrefix { found: prefix });
    }
    Ok(prefix)
}

/// Decodes the prefix and operation byte at the start of `bytes`.
///
/// The prefix is checked before the operation byte is looked at.
pub fn decode_header(bytes: &[u8]) -> Result<(u32, Operation), FrameError> {
    if bytes.len() < HEADER_LEN {
        return Err(FrameError::Truncated {
            needed: HEADER_LEN,
            available: bytes.len(),
        });
    }
    let prefix = decode_prefix([bytes[0], bytes[1], bytes[2], bytes[3]])?;
    let operation = Operation::try_from(bytes[PREFIX_LEN])?;
    Ok((prefix, operation))
}

/// Encodes `prefix | operation | len1 | blob1 | [len2 | blob2]`.
///
/// The second blob must be supplied for [`Operation::Replace`] and only then.
pub fn encode_frame(
    operation: Operation,
    primary: &[u8],
    secondary: Option<&[u8]>,
) -> Result<Vec<u8>, FrameError> {
    match (operation.payload_count(), secondary) {
        (2, None) => return Err(FrameError::MissingSecondary),
        (1, Some(_)) => return Err(FrameError::UnexpectedSecondary),
        _ => {}
    }

    let primary_len = blob_len(primary)?;
    let secondary_len = secondary.map(blob_len).transpose()?;

    let total = HEADER_LEN
        + LENGTH_LEN
        + primary.len()
        + secondary.map_or(0, |s| LENGTH_LEN + s.len());
    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(&MAGIC_PREFIX.to_le_bytes());
    buf.push(operation.into());
    buf.extend_from_slice(&encode_length(primary_len));
    buf.extend_from_slice(primary);
    if let (Some(blob), Some(len)) = (secondary, secondary_len) {
        buf.extend_from_slice(&encode_length(len));
        buf.extend_from_slice(blob);
    }
    Ok(buf)
}

/// Decodes one complete frame held in memory.
///
/// Declared lengths are checked against the bytes actually present before
/// anything is copied, and trailing bytes are rejected.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, FrameError> {
    let (_, operation) = decode_header(bytes)?;
    let mut rest = &bytes[HEADER_LEN..];

    let primary = take_blob(&mut rest)?;
    let secondary = match operation.payload_count() {
        2 => Some(take_blob(&mut rest)?),
        _ => None,
    };

    if !rest.is_empty() {
        return Err(FrameError::TrailingBytes(rest.len()));
    }

    Ok(Frame {
        operation,
        primary,
        secondary,
    })
}

fn blob_len(blob: &[u8]) -> Result<u32, FrameError> {
    u32::try_from(blob.len()).map_err(|_| FrameError::PayloadTooLarge(blob.len()))
}

fn take_blob(rest: &mut &[u8]) -> Result<Vec<u8>, FrameError> {
    if rest.len() < LENGTH_LEN {
        return Err(FrameError::Truncated {
            needed: LENGTH_LEN,
            available: rest.len(),
        });
    }
    let len = decode_length([rest[0], rest[1], rest[2], rest[3]]) as usize;
    let body = &rest[LENGTH_LEN..];
    if body.len() < len {
        return Err(FrameError::Truncated {
            needed: len,
            available: body.len(),
        });
    }
    let blob = body[..len].to_vec();
    *rest = &body[len..];
    Ok(blob)
}
