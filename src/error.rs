//! Error types
//!
//! Only startup and listener failures are errors. Per-request failures
//! are turned into HTTP responses by the handler and never reach here.

use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Port in use or not permitted. Fatal, never retried.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("cannot serve {}: {source}", .path.display())]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid listen address {0}")]
    InvalidAddress(String),

    #[error("failed to initialize log output: {0}")]
    Log(#[source] std::io::Error),

    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl ServerError {
    pub const fn is_bind(&self) -> bool {
        matches!(self, Self::Bind { .. })
    }
}
