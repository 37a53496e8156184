//! Single-file transfer over the Drexel Protocol.
//!
//! The client reads a file and sends it one chunk per SEND; the server
//! accepts one connection and writes what it receives until the client
//! closes.

pub mod client;
pub mod config;
pub mod server;
pub mod summary;

pub use client::{send_file, send_stream};
pub use config::{Config, Mode};
pub use server::{receive_file, receive_stream};
pub use summary::TransferSummary;
