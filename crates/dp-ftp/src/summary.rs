use std::fmt;

use sha2::{Digest, Sha256};

use dp_proto::SessionStats;

/// Result of a completed transfer, on either side.
#[derive(Debug, Clone)]
pub struct TransferSummary {
    pub bytes: u64,
    pub chunks: u64,
    /// Hex SHA-256 of every payload byte, in order.
    pub sha256: String,
    pub stats: SessionStats,
}

impl fmt::Display for TransferSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes in {} chunks sha256={} datagrams_out={} datagrams_in={} errors_sent={}",
            self.bytes,
            self.chunks,
            self.sha256,
            self.stats.datagrams_sent,
            self.stats.datagrams_received,
            self.stats.errors_sent,
        )
    }
}

/// Running totals while chunks move.
pub(crate) struct Tally {
    hasher: Sha256,
    bytes: u64,
    chunks: u64,
}

impl Tally {
    pub(crate) fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            bytes: 0,
            chunks: 0,
        }
    }

    pub(crate) fn add(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
        self.chunks += 1;
    }

    pub(crate) fn chunks(&self) -> u64 {
        self.chunks
    }

    pub(crate) fn finish(self, stats: SessionStats) -> TransferSummary {
        TransferSummary {
            bytes: self.bytes,
            chunks: self.chunks,
            sha256: hex::encode(self.hasher.finalize()),
            stats,
        }
    }
}
