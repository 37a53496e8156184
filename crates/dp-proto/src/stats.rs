//! Session statistics: counters updated on every datagram a session
//! sends or receives. Owned by the session, read by the application
//! for its transfer summary.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Datagrams handed to the socket.
    pub datagrams_sent: u64,
    /// Datagrams taken off the socket, malformed ones included.
    pub datagrams_received: u64,
    /// Application bytes carried by SEND PDUs this side transmitted.
    pub payload_bytes_sent: u64,
    /// Application bytes delivered to the caller by `recv`.
    pub payload_bytes_received: u64,
    /// ERROR PDUs sent back to the peer.
    pub errors_sent: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_sent(&mut self, payload: usize) {
        self.datagrams_sent += 1;
        self.payload_bytes_sent += payload as u64;
    }

    pub(crate) fn on_received(&mut self) {
        self.datagrams_received += 1;
    }

    pub(crate) fn on_delivered(&mut self, payload: usize) {
        self.payload_bytes_received += payload as u64;
    }

    pub(crate) fn on_error_sent(&mut self) {
        self.errors_sent += 1;
    }
}
