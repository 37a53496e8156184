//! Protocol logging trait for per-datagram diagnostics.
//!
//! Sessions report every raw send/receive and every lifecycle transition
//! to a `ProtocolLogger`. Logging is not part of the protocol contract.

use std::fmt;
use std::net::SocketAddr;

use crate::protocol::{RawHeader, HEADER_LEN};

/// Structured log entry for one session.
#[derive(Debug, Clone)]
pub struct ProtocolLog {
    pub role: &'static str,
    pub peer: Option<SocketAddr>,
    pub event: ProtocolEvent,
}

/// Direction of a raw datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => f.write_str("in"),
            Self::Out => f.write_str("out"),
        }
    }
}

/// Session events that can be logged.
#[derive(Debug, Clone)]
pub enum ProtocolEvent {
    /// A datagram left or arrived. `header` is absent when the datagram is
    /// shorter than a header.
    Datagram {
        direction: Direction,
        bytes: usize,
        header: Option<RawHeader>,
    },
    /// Session socket bound
    Bound {
        local: SocketAddr,
    },
    /// CONNECT/ACK exchange complete
    Connected {
        sequence: u32,
    },
    /// CLOSE/ACK exchange complete, session destroyed
    Closed {
        sequence: u32,
    },
    /// Inbound datagram rejected with an ERROR PDU
    Rejected {
        code: i32,
        reason: String,
    },
    /// Reply did not match what the exchange expected
    Unexpected {
        message: String,
    },
}

impl fmt::Display for ProtocolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Datagram { direction, bytes, header: Some(h) } => {
                write!(
                    f,
                    "pdu {} ver={} type={} seq={} size={} err={} bytes={}",
                    direction,
                    h.version,
                    h.type_name(),
                    h.sequence,
                    h.payload_len,
                    h.error_code,
                    bytes,
                )
            }
            Self::Datagram { direction, bytes, header: None } => {
                write!(f, "pdu {} malformed bytes={} header_len={}", direction, bytes, HEADER_LEN)
            }
            Self::Bound { local } => write!(f, "bound local={}", local),
            Self::Connected { sequence } => write!(f, "connection established seq={}", sequence),
            Self::Closed { sequence } => write!(f, "connection closed seq={}", sequence),
            Self::Rejected { code, reason } => write!(f, "rejected code={}: {}", code, reason),
            Self::Unexpected { message } => write!(f, "unexpected: {}", message),
        }
    }
}

/// Trait for protocol logging. Implementations can write to tracing,
/// collect entries for inspection, or discard them.
pub trait ProtocolLogger: Send + Sync {
    fn log(&self, entry: ProtocolLog);
}

/// Logger that uses the `tracing` crate.
pub struct TracingLogger;

impl ProtocolLogger for TracingLogger {
    fn log(&self, entry: ProtocolLog) {
        let peer = entry.peer.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
        // Per-datagram traffic is debug; lifecycle is info; trouble is warn
        match &entry.event {
            ProtocolEvent::Datagram { .. } => {
                tracing::debug!(role = entry.role, peer = %peer, "{}", entry.event);
            }
            ProtocolEvent::Rejected { .. } | ProtocolEvent::Unexpected { .. } => {
                tracing::warn!(role = entry.role, peer = %peer, "{}", entry.event);
            }
            ProtocolEvent::Bound { .. }
            | ProtocolEvent::Connected { .. }
            | ProtocolEvent::Closed { .. } => {
                tracing::info!(role = entry.role, peer = %peer, "{}", entry.event);
            }
        }
    }
}

/// No-op logger that discards all log entries.
pub struct NullLogger;

impl ProtocolLogger for NullLogger {
    fn log(&self, _entry: ProtocolLog) {}
}
