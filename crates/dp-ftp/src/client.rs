//! Sending side: read a file chunk by chunk and push each chunk as one SEND.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};

use anyhow::{ensure, Context, Result};
use tracing::{debug, info};

use dp_proto::{max_payload, Session};

use crate::config::Config;
use crate::summary::{Tally, TransferSummary};

/// Send everything `reader` yields, `chunk_size` bytes per datagram, then
/// close the connection. The session must already be connected.
pub fn send_stream<R: Read>(
    session: &mut Session,
    mut reader: R,
    chunk_size: usize,
) -> Result<TransferSummary> {
    ensure!(session.is_connected(), "client session is not connected");
    ensure!(
        (1..=max_payload()).contains(&chunk_size),
        "chunk size {} outside 1..={}",
        chunk_size,
        max_payload()
    );

    let mut buf = vec![0u8; chunk_size];
    let mut tally = Tally::new();

    loop {
        let n = fill_chunk(&mut reader, &mut buf).context("Read from input failed")?;
        if n == 0 {
            break;
        }
        session
            .send(&buf[..n])
            .with_context(|| format!("Send of chunk {} failed", tally.chunks()))?;
        tally.add(&buf[..n]);
        debug!(chunk = tally.chunks(), bytes = n, seq = session.sequence(), "chunk sent");
    }

    session.disconnect().context("Disconnect failed")?;
    Ok(tally.finish(session.stats()))
}

/// Connect to the configured server and send `<in_dir>/<file>`.
pub fn send_file(config: &Config) -> Result<TransferSummary> {
    let path = config.input_path();
    let file = File::open(&path)
        .with_context(|| format!("Cannot open file {}", path.display()))?;

    let server = config.server_addr();
    let mut session = Session::client(server, config.session_config())
        .with_context(|| format!("Cannot create client socket for {}", server))?;
    session
        .connect()
        .with_context(|| format!("Error establishing connection to {}", server))?;
    info!(%server, seq = session.sequence(), file = %path.display(), "connected, sending");

    let summary = send_stream(&mut session, BufReader::new(file), config.chunk_size())?;
    info!("client closed connection, sent {}", summary);
    Ok(summary)
}

/// Read until `buf` is full or the input ends. Returns the bytes read.
fn fill_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
