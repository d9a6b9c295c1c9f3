//! Errors raised while running the mock server.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use mockhttp_core::{RequestError, UnsatisfiedExpectationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("server is already running on {0}")]
    AlreadyRunning(SocketAddr),

    #[error("invalid value `{value}` for {name}")]
    InvalidConfig { name: &'static str, value: String },

    #[error("failed to read expectations from {path}: {source}")]
    ReadExpectations { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Expectations(#[from] RequestError),

    #[error(transparent)]
    Verification(#[from] UnsatisfiedExpectationError),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
