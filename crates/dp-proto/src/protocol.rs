//! Drexel Protocol PDU format and serialization.
//!
//! Every UDP datagram carries exactly one PDU: a fixed 20-byte header
//! followed by `payload_len` raw application bytes.
//!
//! ```text
//! [0..4]    Protocol version (u32 BE, always 1)
//! [4..8]    Message type bit flags (u32 BE)
//! [8..12]   Sequence number (u32 BE)
//! [12..16]  Payload length (u32 BE)
//! [16..20]  Error code (i32 BE, only meaningful for ERROR)
//! [20..]    Payload (up to 512 bytes)
//! ```
//!
//! Message type bits:
//!
//! ```text
//!   64  32  16  8   4   2   1
//! |---+---+---+---+---+---+---|
//!   E   F   N   C   C   S   A
//!   R   R   A   L   O   E   C
//!   R   A   C   O   N   N   K
//!   O   G   K   S   C   D
//!   R           E   T
//! ```
//!
//! Acknowledgments are the base type OR'ed with ACK.

use std::fmt;

use bytes::{Buf, BufMut};

/// The only protocol version this implementation speaks.
pub const PROTO_VERSION: u32 = 1;

/// Header size in bytes.
pub const HEADER_LEN: usize = 20;

/// Maximum application payload carried by one datagram.
pub const MAX_PAYLOAD: usize = 512;

/// Maximum datagram size (header + payload).
pub const MAX_DATAGRAM: usize = HEADER_LEN + MAX_PAYLOAD;

const ACK_BIT: u32 = 1;

/// Largest payload a single `send` will accept.
pub const fn max_payload() -> usize {
    MAX_PAYLOAD
}

/// PDU message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    Ack = 1,
    Send = 2,
    Connect = 4,
    Close = 8,
    Nack = 16,
    Fragment = 32,
    Error = 64,
    SendAck = 2 | ACK_BIT,
    ConnectAck = 4 | ACK_BIT,
    CloseAck = 8 | ACK_BIT,
}

impl MessageType {
    /// Map a raw wire value to a message type. Unknown bit patterns yield `None`.
    pub fn from_wire(raw: u32) -> Option<Self> {
        let mtype = match raw {
            1 => Self::Ack,
            2 => Self::Send,
            4 => Self::Connect,
            8 => Self::Close,
            16 => Self::Nack,
            32 => Self::Fragment,
            64 => Self::Error,
            3 => Self::SendAck,
            5 => Self::ConnectAck,
            9 => Self::CloseAck,
            _ => return None,
        };
        Some(mtype)
    }

    #[inline]
    pub fn to_wire(self) -> u32 {
        self as u32
    }

    /// True for ACK and every `<base>|ACK` variant.
    #[inline]
    pub fn is_ack(self) -> bool {
        self.to_wire() & ACK_BIT != 0
    }

    /// The acknowledgment that answers this message, if it has one.
    pub fn ack(self) -> Option<Self> {
        match self {
            Self::Send => Some(Self::SendAck),
            Self::Connect => Some(Self::ConnectAck),
            Self::Close => Some(Self::CloseAck),
            _ => None,
        }
    }

    /// True if `self` is the acknowledgment of `base`.
    pub fn acknowledges(self, base: Self) -> bool {
        base.ack() == Some(self)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ack => "ACK",
            Self::Send => "SEND",
            Self::Connect => "CONNECT",
            Self::Close => "CLOSE",
            Self::Nack => "NACK",
            Self::Fragment => "FRAGMENT",
            Self::Error => "ERROR",
            Self::SendAck => "SEND/ACK",
            Self::ConnectAck => "CONNECT/ACK",
            Self::CloseAck => "CLOSE/ACK",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name for a raw wire value, including ones that do not decode.
pub fn wire_type_name(raw: u32) -> &'static str {
    MessageType::from_wire(raw).map_or("***UNKNOWN***", MessageType::name)
}

/// Header fields as they appear on the wire, without validation.
///
/// Diagnostics use this to describe datagrams that `PduHeader::parse`
/// rejects, such as ones with an undefined message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHeader {
    pub version: u32,
    pub message_type: u32,
    pub sequence: u32,
    pub payload_len: u32,
    pub error_code: i32,
}

impl RawHeader {
    /// `None` if `buf` is shorter than a header.
    pub fn peek(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        let mut rd = &buf[..HEADER_LEN];
        Some(Self {
            version: rd.get_u32(),
            message_type: rd.get_u32(),
            sequence: rd.get_u32(),
            payload_len: rd.get_u32(),
            error_code: rd.get_i32(),
        })
    }

    pub fn type_name(&self) -> &'static str {
        wire_type_name(self.message_type)
    }
}

impl From<PduHeader> for RawHeader {
    fn from(h: PduHeader) -> Self {
        Self {
            version: h.version,
            message_type: h.message_type.to_wire(),
            sequence: h.sequence,
            payload_len: h.payload_len,
            error_code: h.error_code,
        }
    }
}

/// Codec failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PduError {
    #[error("datagram too short: {got} bytes, header needs {need}", need = HEADER_LEN)]
    TooShort { got: usize },

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u32),

    #[error("unknown message type {0:#x}")]
    UnknownMessageType(u32),

    #[error("declared payload of {declared} bytes but only {available} present")]
    Truncated { declared: usize, available: usize },

    #[error("buffer of {capacity} bytes cannot hold a {need}-byte datagram")]
    BufferTooSmall { need: usize, capacity: usize },

    #[error("payload of {len} bytes exceeds the {max}-byte maximum", max = MAX_PAYLOAD)]
    PayloadTooLarge { len: usize },
}

/// Parsed PDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduHeader {
    pub version: u32,
    pub message_type: MessageType,
    pub sequence: u32,
    pub payload_len: u32,
    pub error_code: i32,
}

impl PduHeader {
    pub fn new(message_type: MessageType, sequence: u32, payload_len: usize) -> Self {
        Self {
            version: PROTO_VERSION,
            message_type,
            sequence,
            // Callers bound payloads by MAX_PAYLOAD before building headers.
            payload_len: payload_len as u32,
            error_code: 0,
        }
    }

    /// Zero-payload control header.
    pub fn control(message_type: MessageType, sequence: u32) -> Self {
        Self::new(message_type, sequence, 0)
    }

    /// ERROR header carrying a rejection code back to the peer.
    pub fn error(error_code: i32, sequence: u32) -> Self {
        Self {
            error_code,
            ..Self::control(MessageType::Error, sequence)
        }
    }

    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload_len as usize
    }

    /// Serialize the header into the first `HEADER_LEN` bytes of `buf`.
    pub fn write_to(&self, buf: &mut [u8]) -> Result<(), PduError> {
        if buf.len() < HEADER_LEN {
            return Err(PduError::BufferTooSmall {
                need: HEADER_LEN,
                capacity: buf.len(),
            });
        }
        let mut out = &mut buf[..HEADER_LEN];
        out.put_u32(self.version);
        out.put_u32(self.message_type.to_wire());
        out.put_u32(self.sequence);
        out.put_u32(self.payload_len);
        out.put_i32(self.error_code);
        Ok(())
    }

    /// Parse the leading header of a received datagram.
    ///
    /// Only the header is validated here; payload length checks against the
    /// receive buffer are left to the caller.
    pub fn parse(buf: &[u8]) -> Result<Self, PduError> {
        if buf.len() < HEADER_LEN {
            return Err(PduError::TooShort { got: buf.len() });
        }
        let mut rd = &buf[..HEADER_LEN];
        let version = rd.get_u32();
        if version != PROTO_VERSION {
            return Err(PduError::UnsupportedVersion(version));
        }
        let raw_type = rd.get_u32();
        let message_type =
            MessageType::from_wire(raw_type).ok_or(PduError::UnknownMessageType(raw_type))?;
        let sequence = rd.get_u32();
        let payload_len = rd.get_u32();
        let error_code = rd.get_i32();

        Ok(Self {
            version,
            message_type,
            sequence,
            payload_len,
            error_code,
        })
    }
}

/// Write `header` followed by `payload` into `buf`. Returns bytes written.
///
/// The header's `payload_len` is overwritten with `payload.len()` so the two
/// can never disagree on the wire.
pub fn encode_pdu(header: &PduHeader, payload: &[u8], buf: &mut [u8]) -> Result<usize, PduError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(PduError::PayloadTooLarge { len: payload.len() });
    }
    let total = HEADER_LEN + payload.len();
    if buf.len() < total {
        return Err(PduError::BufferTooSmall {
            need: total,
            capacity: buf.len(),
        });
    }

    let header = PduHeader {
        payload_len: payload.len() as u32,
        ..*header
    };
    header.write_to(buf)?;
    buf[HEADER_LEN..total].copy_from_slice(payload);
    Ok(total)
}

/// Parse a complete datagram into its header and payload slice.
pub fn decode_pdu(datagram: &[u8]) -> Result<(PduHeader, &[u8]), PduError> {
    let header = PduHeader::parse(datagram)?;
    let available = datagram.len() - HEADER_LEN;
    let declared = header.payload_len();
    if declared > available {
        return Err(PduError::Truncated { declared, available });
    }
    Ok((header, &datagram[HEADER_LEN..HEADER_LEN + declared]))
}

/// Sequence advance for a PDU carrying `payload_len` bytes.
///
/// Data advances by its byte count, zero-payload messages by one.
#[inline]
pub fn sequence_step(payload_len: usize) -> u32 {
    if payload_len == 0 { 1 } else { payload_len as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_header() {
        let hdr = PduHeader {
            version: PROTO_VERSION,
            message_type: MessageType::Error,
            sequence: 0xDEAD_BEEF,
            payload_len: 0,
            error_code: -32,
        };
        let mut buf = [0u8; HEADER_LEN];
        hdr.write_to(&mut buf).unwrap();
        assert_eq!(PduHeader::parse(&buf).unwrap(), hdr);
    }

    #[test]
    fn header_is_big_endian() {
        let hdr = PduHeader::new(MessageType::Send, 0x0102_0304, 7);
        let mut buf = [0u8; HEADER_LEN];
        hdr.write_to(&mut buf).unwrap();
        assert_eq!(&buf[0..4], &[0, 0, 0, 1]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 2]);
        assert_eq!(&buf[8..12], &[1, 2, 3, 4]);
        assert_eq!(&buf[12..16], &[0, 0, 0, 7]);
    }

    #[test]
    fn roundtrip_pdu_payload_sizes() {
        let mut buf = [0u8; MAX_DATAGRAM];
        for len in [0, 1, 10, MAX_PAYLOAD - 1, MAX_PAYLOAD] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let hdr = PduHeader::new(MessageType::Send, 42, len);
            let n = encode_pdu(&hdr, &payload, &mut buf).unwrap();
            assert_eq!(n, HEADER_LEN + len);

            let (parsed, body) = decode_pdu(&buf[..n]).unwrap();
            assert_eq!(parsed, hdr);
            assert_eq!(body, &payload[..]);
        }
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let mut buf = [0u8; MAX_DATAGRAM + 16];
        let payload = [0u8; MAX_PAYLOAD + 1];
        let hdr = PduHeader::new(MessageType::Send, 0, payload.len());
        assert_eq!(
            encode_pdu(&hdr, &payload, &mut buf),
            Err(PduError::PayloadTooLarge { len: MAX_PAYLOAD + 1 })
        );
    }

    #[test]
    fn encode_rejects_small_buffer() {
        let mut buf = [0u8; HEADER_LEN + 3];
        let hdr = PduHeader::new(MessageType::Send, 0, 4);
        assert_eq!(
            encode_pdu(&hdr, b"abcd", &mut buf),
            Err(PduError::BufferTooSmall { need: HEADER_LEN + 4, capacity: HEADER_LEN + 3 })
        );
    }

    #[test]
    fn reject_short_buffer() {
        let buf = [0u8; HEADER_LEN - 1];
        assert_eq!(
            PduHeader::parse(&buf),
            Err(PduError::TooShort { got: HEADER_LEN - 1 })
        );
    }

    #[test]
    fn reject_bad_version() {
        let mut buf = [0u8; HEADER_LEN];
        PduHeader::control(MessageType::Connect, 0).write_to(&mut buf).unwrap();
        buf[3] = 2;
        assert_eq!(PduHeader::parse(&buf), Err(PduError::UnsupportedVersion(2)));
    }

    #[test]
    fn reject_unknown_type() {
        let mut buf = [0u8; HEADER_LEN];
        PduHeader::control(MessageType::Connect, 0).write_to(&mut buf).unwrap();
        buf[7] = 6; // SEND|CONNECT is not a defined type
        assert_eq!(PduHeader::parse(&buf), Err(PduError::UnknownMessageType(6)));
    }

    #[test]
    fn reject_truncated_payload() {
        let mut buf = [0u8; MAX_DATAGRAM];
        let hdr = PduHeader::new(MessageType::Send, 0, 10);
        let n = encode_pdu(&hdr, &[7u8; 10], &mut buf).unwrap();
        assert_eq!(
            decode_pdu(&buf[..n - 4]),
            Err(PduError::Truncated { declared: 10, available: 6 })
        );
    }

    #[test]
    fn ack_variants() {
        assert_eq!(MessageType::SendAck.to_wire(), 3);
        assert_eq!(MessageType::ConnectAck.to_wire(), 5);
        assert_eq!(MessageType::CloseAck.to_wire(), 9);

        assert!(MessageType::SendAck.acknowledges(MessageType::Send));
        assert!(!MessageType::SendAck.acknowledges(MessageType::Close));
        assert!(!MessageType::Ack.acknowledges(MessageType::Send));

        assert!(MessageType::Ack.is_ack());
        assert!(MessageType::CloseAck.is_ack());
        assert!(!MessageType::Error.is_ack());
        assert_eq!(MessageType::Error.ack(), None);
    }

    #[test]
    fn wire_names() {
        assert_eq!(wire_type_name(5), "CONNECT/ACK");
        assert_eq!(wire_type_name(128), "***UNKNOWN***");
    }

    #[test]
    fn raw_header_reads_undefined_types() {
        let mut buf = [0u8; HEADER_LEN];
        PduHeader::control(MessageType::Close, 42).write_to(&mut buf).unwrap();
        buf[7] = 6;
        let raw = RawHeader::peek(&buf).unwrap();
        assert_eq!(raw.message_type, 6);
        assert_eq!(raw.sequence, 42);
        assert_eq!(raw.type_name(), "***UNKNOWN***");

        assert!(RawHeader::peek(&buf[..HEADER_LEN - 1]).is_none());

        let from_parsed = RawHeader::from(PduHeader::new(MessageType::Send, 3, 9));
        assert_eq!(from_parsed.message_type, 2);
        assert_eq!(from_parsed.type_name(), "SEND");
    }

    #[test]
    fn sequence_steps() {
        assert_eq!(sequence_step(0), 1);
        assert_eq!(sequence_step(10), 10);
        assert_eq!(sequence_step(MAX_PAYLOAD), MAX_PAYLOAD as u32);
    }
}
