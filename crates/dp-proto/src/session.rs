//! Per-connection session state.
//!
//! A `Session` owns its socket, its send/receive buffers, the running
//! sequence counter and the connected flag. Exactly one call stack drives a
//! session; nothing here is shared.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::logging::{Direction, ProtocolEvent, ProtocolLog, ProtocolLogger, TracingLogger};
use crate::protocol::{encode_pdu, PduHeader, RawHeader, MAX_DATAGRAM};
use crate::socket::DatagramSocket;
use crate::stats::SessionStats;

/// Connection lifecycle.
///
/// ```text
/// Disconnected --CONNECT / CONNECT|ACK--> Connected --CLOSE / CLOSE|ACK--> Closed
/// ```
///
/// `Closed` is terminal: the socket has been released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connected => f.write_str("connected"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// Which end of the connection this session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

/// Session configuration.
#[derive(Clone)]
pub struct SessionConfig {
    /// How long a blocking receive may wait. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Where per-datagram diagnostics go. `None` disables them.
    pub logger: Option<Arc<dyn ProtocolLogger>>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout: None,
            logger: Some(Arc::new(TracingLogger)),
        }
    }
}

impl SessionConfig {
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ProtocolLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn without_logger(mut self) -> Self {
        self.logger = None;
        self
    }
}

/// One logical connection between two peers.
pub struct Session {
    role: Role,
    /// Released exactly once, when the session reaches `Closed`.
    socket: Option<DatagramSocket>,
    pub(crate) sequence: u32,
    pub(crate) state: SessionState,
    send_buf: Box<[u8]>,
    pub(crate) recv_buf: Box<[u8]>,
    pub(crate) stats: SessionStats,
    logger: Option<Arc<dyn ProtocolLogger>>,
}

impl Session {
    /// Server session listening on every interface at `port`.
    pub fn server(port: u16, config: SessionConfig) -> Result<Self> {
        Self::bind((Ipv4Addr::UNSPECIFIED, port).into(), config)
    }

    /// Server session bound to `addr`. The client's address is learned from
    /// the first datagram that arrives.
    pub fn bind(addr: SocketAddr, config: SessionConfig) -> Result<Self> {
        let socket = DatagramSocket::bind(addr)?;
        Self::with_socket(Role::Server, socket, config)
    }

    /// Client session talking to the server at `server`.
    pub fn client(server: SocketAddr, config: SessionConfig) -> Result<Self> {
        let socket = DatagramSocket::connect(server)?;
        Self::with_socket(Role::Client, socket, config)
    }

    fn with_socket(role: Role, socket: DatagramSocket, config: SessionConfig) -> Result<Self> {
        socket.set_read_timeout(config.read_timeout)?;
        let session = Self {
            role,
            socket: Some(socket),
            sequence: 0,
            state: SessionState::Disconnected,
            send_buf: vec![0u8; MAX_DATAGRAM].into_boxed_slice(),
            recv_buf: vec![0u8; MAX_DATAGRAM].into_boxed_slice(),
            stats: SessionStats::new(),
            logger: config.logger,
        };
        if let Some(local) = session.local_addr() {
            session.log(ProtocolEvent::Bound { local });
        }
        Ok(session)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Current sequence number.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// `None` once the session is closed.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().map(DatagramSocket::local_addr)
    }

    /// `None` until the peer is known, and again once the session is closed.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(DatagramSocket::peer_addr)
    }

    pub(crate) fn require(&self, op: &'static str, state: SessionState) -> Result<()> {
        if self.state != state {
            return Err(Error::InvalidState {
                op,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Encode and send one PDU. Returns the datagram size.
    pub(crate) fn transmit(&mut self, header: PduHeader, payload: &[u8]) -> Result<usize> {
        let len = encode_pdu(&header, payload, &mut self.send_buf)?;
        let socket = self.socket.as_ref().ok_or(Error::InvalidState {
            op: "datagram I/O",
            state: self.state,
        })?;
        if socket.peer_addr().is_none() {
            return Err(Error::NoPeer);
        }
        let sent = socket.send_raw(&self.send_buf[..len])?;

        self.log(ProtocolEvent::Datagram {
            direction: Direction::Out,
            bytes: sent,
            header: Some(header.into()),
        });
        if sent != len {
            return Err(Error::ShortSend {
                sent,
                expected: len,
            });
        }
        self.stats.on_sent(payload.len());
        Ok(len)
    }

    /// Block for one datagram into the receive buffer. Returns its size.
    pub(crate) fn receive(&mut self) -> Result<usize> {
        let socket = self.socket.as_mut().ok_or(Error::InvalidState {
            op: "datagram I/O",
            state: self.state,
        })?;
        let len = socket.recv_raw(&mut self.recv_buf)?;

        self.stats.on_received();
        self.log(ProtocolEvent::Datagram {
            direction: Direction::In,
            bytes: len,
            header: RawHeader::peek(&self.recv_buf[..len]),
        });
        Ok(len)
    }

    /// Release the socket and enter the terminal state.
    pub(crate) fn destroy(&mut self) {
        self.log(ProtocolEvent::Closed {
            sequence: self.sequence,
        });
        self.state = SessionState::Closed;
        self.socket = None;
    }

    pub(crate) fn log(&self, event: ProtocolEvent) {
        if let Some(ref logger) = self.logger {
            logger.log(ProtocolLog {
                role: self.role.as_str(),
                peer: self.peer_addr(),
                event,
            });
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("sequence", &self.sequence)
            .field("local", &self.local_addr())
            .field("peer", &self.peer_addr())
            .finish()
    }
}
