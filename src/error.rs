//! Fatal errors of the responder.
//!
//! Only failures that stop the process live here. Per-connection I/O
//! failures stay as `std::io::Error`, get logged by the event loop and never
//! leave it.

use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for bootstrap and event loop operations
pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be created or configured
    #[error("failed to create server socket: {0}")]
    Socket(#[source] std::io::Error),

    /// bind(2) failed, usually because the port is taken
    #[error("failed to bind server socket to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// listen(2) failed
    #[error("failed to listen on server socket: {source}")]
    Listen {
        #[source]
        source: std::io::Error,
    },

    /// The readiness multiplexer could not be created
    #[error("failed to create multiplexer: {0}")]
    Multiplexer(#[source] std::io::Error),

    /// The listener (or the shutdown waker) could not be registered
    #[error("failed to register listener with multiplexer: {0}")]
    Register(#[source] std::io::Error),

    /// Waiting for readiness failed for a reason other than EINTR
    #[error("multiplexer wait failed: {0}")]
    Wait(#[source] std::io::Error),
}
