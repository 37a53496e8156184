use std::net::{IpAddr, SocketAddr};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use dp_proto::SessionConfig;

pub const DEFAULT_PORT: u16 = 2080;

/// Client reads up to this many bytes per SEND; must not exceed the protocol maximum.
pub const DEFAULT_CHUNK_SIZE: u16 = 500;

/// Program mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Client,
    Server,
}

/// Command line, with environment fallbacks (`.env` is loaded first).
#[derive(Debug, Clone, Parser)]
#[command(name = "dp-ftp", version, about = "Send or receive one file over the Drexel Protocol")]
pub struct Config {
    /// Run in client mode and send the file (default).
    #[arg(short = 'c', long = "client", conflicts_with = "server")]
    pub client: bool,

    /// Run in server mode and receive the file.
    #[arg(short = 's', long = "server")]
    pub server: bool,

    /// Server IP address the client connects to.
    #[arg(short = 'a', long = "addr", env = "DP_SERVER_ADDR", default_value = "127.0.0.1")]
    pub addr: IpAddr,

    /// UDP port.
    #[arg(short = 'p', long = "port", env = "DP_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// File name to send or receive.
    #[arg(short = 'f', long = "file", env = "DP_FILE", default_value = "test.c")]
    pub file: String,

    /// Directory the client reads from.
    #[arg(long, env = "DP_IN_DIR", default_value = "./infile")]
    pub in_dir: PathBuf,

    /// Directory the server writes to.
    #[arg(long, env = "DP_OUT_DIR", default_value = "./outfile")]
    pub out_dir: PathBuf,

    /// Bytes per SEND (1..=512).
    #[arg(
        long,
        env = "DP_CHUNK_SIZE",
        default_value_t = DEFAULT_CHUNK_SIZE,
        value_parser = clap::value_parser!(u16).range(1..=512)
    )]
    pub chunk_size: u16,

    /// Give up on a reply after this many milliseconds instead of waiting forever.
    #[arg(long, env = "DP_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Log every PDU.
    #[arg(long)]
    pub debug: bool,
}

impl Config {
    pub fn mode(&self) -> Mode {
        if self.server { Mode::Server } else { Mode::Client }
    }

    /// Reject file names that would leave the in/out directories.
    pub fn validate(&self) -> Result<()> {
        let mut components = Path::new(&self.file).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => bail!("file name must be a plain name, got {:?}", self.file),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size as usize
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }

    pub fn input_path(&self) -> PathBuf {
        self.in_dir.join(&self.file)
    }

    pub fn output_path(&self) -> PathBuf {
        self.out_dir.join(&self.file)
    }

    pub fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::default();
        match self.timeout_ms {
            Some(ms) => config.with_read_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }
}
