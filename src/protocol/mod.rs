// src/protocol/mod.rs
pub mod client;
pub mod packet;

use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to resolve {0}")]
    Resolve(String),
    #[error("connection failed: {0}")]
    Connect(#[source] io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
}
