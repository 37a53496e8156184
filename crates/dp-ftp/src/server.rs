//! Receiving side: accept one connection and write every SEND payload out.

use std::fs::{self, File};
use std::io::{BufWriter, Write};

use anyhow::{ensure, Context, Result};
use tracing::{debug, info, warn};

use dp_proto::{max_payload, Error, Received, Session};

use crate::config::Config;
use crate::summary::{Tally, TransferSummary};

/// Bytes of each chunk shown in debug output.
const PREVIEW_LEN: usize = 50;

/// Receive chunks into `writer` until the peer closes. The session must
/// already be connected.
///
/// Malformed or oversized datagrams have already been answered with an
/// ERROR PDU. They, and messages of an unexpected type, are skipped and the
/// loop keeps waiting. Socket failures and timeouts end the transfer.
pub fn receive_stream<W: Write>(session: &mut Session, mut writer: W) -> Result<TransferSummary> {
    ensure!(session.is_connected(), "server session is not connected");

    let mut buf = vec![0u8; max_payload()];
    let mut tally = Tally::new();

    loop {
        match session.recv(&mut buf) {
            Ok(Received::Data(n)) => {
                let chunk = &buf[..n];
                writer.write_all(chunk).context("Write to output failed")?;
                tally.add(chunk);
                debug!(
                    chunk = tally.chunks(),
                    bytes = n,
                    seq = session.sequence(),
                    preview = %String::from_utf8_lossy(&chunk[..n.min(PREVIEW_LEN)]),
                    "chunk received"
                );
            }
            Ok(Received::Closed) => break,
            Err(
                e @ (Error::BadDatagram(_)
                | Error::BufferUndersized { .. }
                | Error::Protocol { .. }),
            ) => {
                warn!(error = %e, "datagram rejected, waiting for the next one");
            }
            Err(e) => return Err(e).context("Receive failed"),
        }
    }

    writer.flush().context("Flush of output failed")?;
    Ok(tally.finish(session.stats()))
}

/// Listen on the configured port and write the received file to
/// `<out_dir>/<file>`.
pub fn receive_file(config: &Config) -> Result<TransferSummary> {
    let mut session = Session::server(config.port, config.session_config())
        .with_context(|| format!("Cannot bind UDP port {}", config.port))?;
    info!(port = config.port, "waiting for a connection");

    session.listen().context("Error establishing connection")?;
    info!(
        peer = ?session.peer_addr(),
        seq = session.sequence(),
        "connection established"
    );

    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("Cannot create {}", config.out_dir.display()))?;
    let path = config.output_path();
    let file = File::create(&path)
        .with_context(|| format!("Cannot create {}", path.display()))?;

    let summary = receive_stream(&mut session, BufWriter::new(file))?;
    info!(file = %path.display(), "client closed connection, received {}", summary);
    Ok(summary)
}
