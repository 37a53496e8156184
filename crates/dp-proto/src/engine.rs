//! Connection, acknowledgment and sequencing over a `Session`.
//!
//! Strictly one outstanding datagram at a time: every operation sends at
//! most one PDU and waits for at most one reply. Nothing is retransmitted,
//! so with no read timeout configured a lost reply blocks the caller forever.
//!
//! ```text
//!   client                         server
//!   connect  --CONNECT(seq)------>  listen     seq = seq + 1
//!   seq = ack.seq <--CONNECT|ACK--
//!   send     --SEND(seq, data)--->  recv       seq += len or 1
//!   seq += len or 1 <--SEND|ACK---
//!   disconnect --CLOSE(seq)------>  recv       -> Received::Closed
//!            <--CLOSE|ACK--------
//! ```

use crate::error::{Error, Result};
use crate::logging::ProtocolEvent;
use crate::protocol::{sequence_step, MessageType, PduError, PduHeader, HEADER_LEN, MAX_PAYLOAD};
use crate::session::{Session, SessionState};

/// Outcome of a successful [`Session::recv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// This many payload bytes were copied into the caller's buffer.
    Data(usize),
    /// The peer closed the connection; the session is destroyed.
    Closed,
}

impl Session {
    /// Open the connection from the client side.
    ///
    /// On success both ends hold the same sequence number.
    pub fn connect(&mut self) -> Result<()> {
        self.require("connect", SessionState::Disconnected)?;
        if self.peer_addr().is_none() {
            return Err(Error::NoPeer);
        }

        self.transmit(PduHeader::control(MessageType::Connect, self.sequence), &[])?;
        let reply = self.await_ack(MessageType::Connect)?;

        self.sequence = reply.sequence;
        self.state = SessionState::Connected;
        self.log(ProtocolEvent::Connected {
            sequence: self.sequence,
        });
        Ok(())
    }

    /// Accept the connection on the server side. Exactly one inbound
    /// datagram is consulted; it must be a CONNECT.
    pub fn listen(&mut self) -> Result<()> {
        self.require("listen", SessionState::Disconnected)?;

        let len = self.receive()?;
        let request = PduHeader::parse(&self.recv_buf[..len])?;
        if request.message_type != MessageType::Connect {
            return Err(Error::Protocol {
                expected: MessageType::Connect,
                got: request.message_type,
            });
        }

        self.sequence = request.sequence.wrapping_add(1);
        self.transmit(PduHeader::control(MessageType::ConnectAck, self.sequence), &[])?;
        self.state = SessionState::Connected;
        self.log(ProtocolEvent::Connected {
            sequence: self.sequence,
        });
        Ok(())
    }

    /// Send one chunk of application data and wait for its SEND|ACK.
    ///
    /// Returns the number of payload bytes transmitted.
    pub fn send(&mut self, data: &[u8]) -> Result<usize> {
        self.require("send", SessionState::Connected)?;
        if data.len() > MAX_PAYLOAD {
            return Err(Error::BufferOversized { len: data.len() });
        }

        self.transmit(PduHeader::new(MessageType::Send, self.sequence, data.len()), data)?;
        self.sequence = self.sequence.wrapping_add(sequence_step(data.len()));

        let reply = self.await_ack(MessageType::Send)?;
        if reply.sequence != self.sequence {
            self.log(ProtocolEvent::Unexpected {
                message: format!(
                    "SEND/ACK seq {} does not match local seq {}",
                    reply.sequence, self.sequence
                ),
            });
        }
        Ok(data.len())
    }

    /// Receive one chunk of application data into `buf`.
    ///
    /// A malformed or oversized datagram is answered with an ERROR PDU and
    /// leaves the sequence number untouched. A CLOSE is acknowledged and
    /// destroys the session.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<Received> {
        self.require("recv", SessionState::Connected)?;

        let len = self.receive()?;
        let header = match PduHeader::parse(&self.recv_buf[..len]) {
            Ok(header) => header,
            Err(e) => return self.reject(Error::BadDatagram(e)),
        };
        let declared = header.payload_len();
        if declared > buf.len() {
            return self.reject(Error::BufferUndersized {
                declared,
                capacity: buf.len(),
            });
        }
        let available = len - HEADER_LEN;
        if declared > available {
            return self.reject(Error::BadDatagram(PduError::Truncated { declared, available }));
        }

        self.sequence = self.sequence.wrapping_add(sequence_step(declared));

        match header.message_type {
            MessageType::Send => {
                buf[..declared].copy_from_slice(&self.recv_buf[HEADER_LEN..HEADER_LEN + declared]);
                self.stats.on_delivered(declared);
                self.transmit(PduHeader::control(MessageType::SendAck, self.sequence), &[])?;
                Ok(Received::Data(declared))
            }
            MessageType::Close => {
                self.transmit(PduHeader::control(MessageType::CloseAck, self.sequence), &[])?;
                self.destroy();
                Ok(Received::Closed)
            }
            other => {
                self.log(ProtocolEvent::Unexpected {
                    message: format!("{} while waiting for SEND or CLOSE", other),
                });
                Err(Error::Protocol {
                    expected: MessageType::Send,
                    got: other,
                })
            }
        }
    }

    /// Close the connection from the client side.
    ///
    /// The session is destroyed whatever happens. A CLOSE that cannot be
    /// sent, and I/O failures or timeouts while waiting for the reply, are
    /// reported after the session is gone; a wrong reply is only logged.
    pub fn disconnect(&mut self) -> Result<()> {
        self.require("disconnect", SessionState::Connected)?;

        if let Err(e) = self.transmit(PduHeader::control(MessageType::Close, self.sequence), &[]) {
            self.destroy();
            return Err(e);
        }
        self.sequence = self.sequence.wrapping_add(sequence_step(0));

        let outcome = match self.await_ack(MessageType::Close) {
            Ok(_) => Ok(()),
            Err(e @ (Error::Io(_) | Error::Timeout)) => Err(e),
            Err(e) => {
                self.log(ProtocolEvent::Unexpected {
                    message: format!("closing anyway: {}", e),
                });
                Ok(())
            }
        };
        self.destroy();
        outcome
    }

    /// Block for the single reply to a `base` message and require it to be
    /// `base`'s acknowledgment.
    fn await_ack(&mut self, base: MessageType) -> Result<PduHeader> {
        let len = self.receive()?;
        let reply = PduHeader::parse(&self.recv_buf[..len])?;
        let expected = base.ack().unwrap_or(MessageType::Ack);

        if reply.message_type == MessageType::Error {
            self.log(ProtocolEvent::Unexpected {
                message: format!("peer answered {} with ERROR code {}", base, reply.error_code),
            });
            return Err(Error::Rejected {
                code: reply.error_code,
            });
        }
        if !reply.message_type.acknowledges(base) {
            self.log(ProtocolEvent::Unexpected {
                message: format!("expected {} but got {}", expected, reply.message_type),
            });
            return Err(Error::Protocol {
                expected,
                got: reply.message_type,
            });
        }
        Ok(reply)
    }

    /// Tell the peer its datagram was rejected, then fail with `err`.
    fn reject(&mut self, err: Error) -> Result<Received> {
        let code = err.code().to_wire();
        self.log(ProtocolEvent::Rejected {
            code,
            reason: err.to_string(),
        });
        self.transmit(PduHeader::error(code, self.sequence), &[])?;
        self.stats.on_error_sent();
        Err(err)
    }
}
