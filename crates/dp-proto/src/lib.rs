//! Drexel Protocol: reliable, connection-oriented messaging over UDP.
//!
//! Provides a strictly synchronous protocol on top of plain datagrams:
//! - CONNECT / CONNECT|ACK handshake that agrees on a sequence number
//! - One SEND per datagram, each answered by exactly one SEND|ACK
//! - ERROR replies for malformed or oversized datagrams
//! - CLOSE / CLOSE|ACK teardown that destroys the session
//!
//! No retransmission, windowing or congestion control: a lost reply blocks
//! the caller unless a read timeout is configured.

pub mod engine;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod socket;
pub mod stats;

// Re-export key types for convenience.
pub use engine::Received;
pub use error::{Error, ErrorCode, Result};
pub use logging::{NullLogger, ProtocolLogger, TracingLogger};
pub use protocol::{
    decode_pdu, encode_pdu, max_payload, MessageType, PduError, PduHeader, RawHeader, HEADER_LEN,
    MAX_DATAGRAM, MAX_PAYLOAD, PROTO_VERSION,
};
pub use session::{Role, Session, SessionConfig, SessionState};
pub use stats::SessionStats;
