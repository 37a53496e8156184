//! Error taxonomy for protocol operations.

use std::io;

use crate::protocol::{MessageType, PduError, MAX_PAYLOAD};
use crate::session::SessionState;

/// Alias for `Result<T, dp_proto::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Result codes as they travel in the `error_code` field of an ERROR PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    NoError = 0,
    General = -1,
    Protocol = -2,
    BufferUndersized = -4,
    BufferOversized = -8,
    ConnectionClosed = -16,
    BadDatagram = -32,
}

impl ErrorCode {
    pub fn from_wire(raw: i32) -> Option<Self> {
        let code = match raw {
            0 => Self::NoError,
            -1 => Self::General,
            -2 => Self::Protocol,
            -4 => Self::BufferUndersized,
            -8 => Self::BufferOversized,
            -16 => Self::ConnectionClosed,
            -32 => Self::BadDatagram,
            _ => return None,
        };
        Some(code)
    }

    #[inline]
    pub fn to_wire(self) -> i32 {
        self as i32
    }
}

/// Errors returned by session operations.
///
/// A connection close is never an error; see [`crate::Received::Closed`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The operation is not valid in the session's current state.
    #[error("{op} not allowed while {state}")]
    InvalidState {
        op: &'static str,
        state: SessionState,
    },

    /// No peer address is known yet, so nothing can be sent.
    #[error("peer address not known")]
    NoPeer,

    /// A message of the wrong type arrived for the current exchange.
    #[error("expected {expected}, got {got}")]
    Protocol {
        expected: MessageType,
        got: MessageType,
    },

    /// The peer declared a payload larger than the caller's buffer.
    #[error("declared payload of {declared} bytes exceeds the {capacity}-byte buffer")]
    BufferUndersized { declared: usize, capacity: usize },

    /// The caller tried to send more than one datagram can carry.
    #[error("cannot send {len} bytes, maximum is {max}", max = MAX_PAYLOAD)]
    BufferOversized { len: usize },

    /// A malformed datagram was received.
    #[error("bad datagram: {0}")]
    BadDatagram(#[from] PduError),

    /// The peer answered with an ERROR PDU instead of an acknowledgment.
    #[error("peer rejected datagram with code {code}")]
    Rejected { code: i32 },

    /// The socket accepted fewer bytes than the datagram holds.
    #[error("short send: {sent} of {expected} bytes")]
    ShortSend { sent: usize, expected: usize },

    /// The configured read timeout elapsed before a reply arrived.
    #[error("timed out waiting for a datagram")]
    Timeout,

    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            // Unix reports an elapsed SO_RCVTIMEO as WouldBlock, Windows as TimedOut.
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(e),
        }
    }
}

impl Error {
    /// Wire code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Protocol { .. } => ErrorCode::Protocol,
            Self::BufferUndersized { .. } => ErrorCode::BufferUndersized,
            Self::BufferOversized { .. } => ErrorCode::BufferOversized,
            Self::BadDatagram(_) => ErrorCode::BadDatagram,
            Self::Rejected { code } => ErrorCode::from_wire(*code).unwrap_or(ErrorCode::General),
            Self::InvalidState { .. }
            | Self::NoPeer
            | Self::ShortSend { .. }
            | Self::Timeout
            | Self::Io(_) => ErrorCode::General,
        }
    }
}
