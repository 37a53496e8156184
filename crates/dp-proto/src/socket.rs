//! Raw datagram I/O.
//!
//! One `send_raw` is exactly one `send_to`, one `recv_raw` one blocking
//! receive of a datagram from the peer. The peer address starts unknown on
//! the server side and is learned from the first inbound datagram; from then
//! on datagrams from any other source are dropped. The socket itself is never
//! connected, so an absent peer shows up as silence (or a read timeout) and
//! not as an ICMP-driven `ConnectionRefused`.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

/// UDP socket plus the peer it talks to.
#[derive(Debug)]
pub struct DatagramSocket {
    inner: UdpSocket,
    local: SocketAddr,
    peer: Option<SocketAddr>,
}

impl DatagramSocket {
    /// Bind a listening socket with address reuse. The peer is unknown until
    /// the first datagram arrives.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        // Restarted servers must not wait for the OS to release the port
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(false)?;
        socket.bind(&addr.into())?;

        let inner: UdpSocket = socket.into();
        let local = inner.local_addr()?;
        Ok(Self {
            inner,
            local,
            peer: None,
        })
    }

    /// Bind an ephemeral port and fix the peer to `peer`.
    pub fn connect(peer: SocketAddr) -> io::Result<Self> {
        let any: SocketAddr = match peer {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = Socket::new(Domain::for_address(peer), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_nonblocking(false)?;
        socket.bind(&any.into())?;

        let inner: UdpSocket = socket.into();
        let local = inner.local_addr()?;
        Ok(Self {
            inner,
            local,
            peer: Some(peer),
        })
    }

    /// `None` blocks forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.inner.set_read_timeout(timeout)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Send one datagram to the peer.
    pub fn send_raw(&self, datagram: &[u8]) -> io::Result<usize> {
        let peer = self.peer.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "peer address not known")
        })?;
        self.inner.send_to(datagram, peer)
    }

    /// Receive one datagram from the peer into `buf`. The first datagram on
    /// an unpeered socket fixes the peer for the socket's lifetime.
    ///
    /// With a read timeout set, each dropped stranger datagram restarts the
    /// wait.
    pub fn recv_raw(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let (len, src) = self.inner.recv_from(buf)?;
            match self.peer {
                None => {
                    self.peer = Some(src);
                    return Ok(len);
                }
                Some(peer) if peer == src => return Ok(len),
                Some(peer) => {
                    debug!(%src, %peer, bytes = len, "dropping datagram from unknown source");
                }
            }
        }
    }
}
