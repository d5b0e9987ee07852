use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Port the responder listens on.
pub const DEFAULT_PORT: u16 = 8080;

/// Runtime parameters of the event loop.
///
/// There is no file or environment layer: `Config::default()` is what the
/// binary runs with, tests and embedders build their own.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Pending-connection queue length handed to listen(2)
    pub backlog: i32,
    /// Capacity of the per-wait event batch
    pub max_events: usize,
    /// Size of a single read call while draining a socket
    pub read_chunk: usize,
    /// Connections whose buffered request grows past this are dropped
    pub max_request_bytes: usize,
    /// Close connections that stay silent this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            backlog: libc::SOMAXCONN,
            max_events: 100,
            read_chunk: 1024,
            max_request_bytes: 8192,
            idle_timeout: None,
        }
    }
}

impl Config {
    /// Defaults, listening on `listen_addr` instead of `0.0.0.0:8080`.
    pub fn with_listen_addr(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Self::default()
        }
    }
}
