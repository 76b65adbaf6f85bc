//! Error types
//!
//! Only setup failures are errors. Feed termination is reported as a
//! [`Termination`](crate::server::Termination) and subscriber failures as a
//! [`DisconnectReason`](crate::session::DisconnectReason).

use std::net::SocketAddr;
use std::path::PathBuf;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for relay setup and I/O
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The listening socket could not be created, bound or put into listen mode
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The feed could not be opened
    #[error("failed to open feed {}: {source}", path.display())]
    FeedOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Logging could not be initialized
    #[error("failed to initialize logging: {0}")]
    Logging(String),

    /// Any other I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
