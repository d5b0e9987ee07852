use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use mio::net::{TcpListener, TcpStream};
use mio::{Interest, Token, Waker};
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::error::{Result, ServerError};
use crate::http::connection::{Connection, Flow};
use crate::server::listener::{Accept, accept_one, create_listener, is_resource_exhausted};
use crate::server::poller::{Multiplexer, Readiness};

// Client tokens are their descriptor numbers, which never get this high.
const LISTENER: Token = Token(usize::MAX);
const WAKER: Token = Token(usize::MAX - 1);

/// Asks a running [`EventLoop`] to return from [`EventLoop::run`].
///
/// The only piece of the loop that may cross threads.
#[derive(Clone)]
pub struct ShutdownHandle {
    waker: Arc<Waker>,
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) -> io::Result<()> {
        self.requested.store(true, Ordering::Release);
        self.waker.wake()
    }

    fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// Single-threaded accept/read/route/write loop.
///
/// Owns the listener, the multiplexer and every live connection. A
/// connection is in `connections` exactly as long as its stream is
/// registered.
pub struct EventLoop {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    multiplexer: Multiplexer,
    connections: HashMap<Token, Connection>,
    shutdown: ShutdownHandle,
    scratch: Vec<u8>,
}

impl EventLoop {
    /// Creates the listener and the multiplexer and registers the listener.
    /// Every failure here is fatal.
    pub fn bind(config: Config) -> Result<Self> {
        let mut listener = create_listener(config.listen_addr, config.backlog)?;
        let local_addr = listener.local_addr().map_err(ServerError::Socket)?;

        let mut multiplexer =
            Multiplexer::new(config.max_events).map_err(ServerError::Multiplexer)?;
        multiplexer
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(ServerError::Register)?;
        let waker = multiplexer.waker(WAKER).map_err(ServerError::Register)?;

        debug!("Listening on {}", local_addr);

        Ok(Self {
            scratch: vec![0; config.read_chunk.max(1)],
            config,
            listener,
            local_addr,
            multiplexer,
            connections: HashMap::new(),
            shutdown: ShutdownHandle {
                waker: Arc::new(waker),
                requested: Arc::new(AtomicBool::new(false)),
            },
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Live registrations, including the listener and the shutdown waker.
    pub fn registration_count(&self) -> usize {
        self.multiplexer.registrations()
    }

    /// Runs until shutdown is requested or waiting fails.
    pub fn run(&mut self) -> Result<()> {
        let mut ready = Vec::with_capacity(self.config.max_events);

        loop {
            let timeout = self.next_timeout(Instant::now());
            if let Err(e) = self.multiplexer.wait(timeout, &mut ready) {
                error!(error = %e, "epoll_wait error");
                return Err(ServerError::Wait(e));
            }

            for readiness in &ready {
                match readiness.token {
                    LISTENER => self.accept_all(),
                    WAKER => {}
                    token => self.serve(token, readiness),
                }
            }

            self.expire_idle(Instant::now());

            if self.shutdown.is_requested() {
                info!(open = self.connections.len(), "Shutdown requested");
                return Ok(());
            }
        }
    }

    /// Readiness on the listener is edge-triggered too, so keep accepting
    /// until the backlog is empty or a burst of connects would be stranded.
    /// A failed accept only abandons that one client.
    fn accept_all(&mut self) {
        loop {
            match accept_one(&self.listener) {
                Ok(Accept::Connection(stream, peer)) => self.admit(stream, peer),
                Ok(Accept::WouldBlock) => break,
                Err(e) if is_resource_exhausted(&e) => {
                    error!(
                        error = %e,
                        open = self.connections.len(),
                        "Out of resources, pausing accept"
                    );
                    break;
                }
                Err(e) => warn!(error = %e, "Failed to accept client connection"),
            }
        }
    }

    fn admit(&mut self, mut stream: TcpStream, peer: SocketAddr) {
        let token = Token(stream.as_raw_fd() as usize);

        if let Err(e) = self.multiplexer.register(&mut stream, token, Interest::READABLE) {
            warn!(peer = %peer, error = %e, "Failed to add client socket to multiplexer");
            return;
        }

        info!("New client connected: {}", peer);
        self.connections.insert(
            token,
            Connection::new(stream, peer, self.config.max_request_bytes),
        );
    }

    fn serve(&mut self, token: Token, readiness: &Readiness) {
        trace!(?token, ?readiness, "client event");

        // A descriptor closed earlier in this batch may already belong to a
        // new connection; its read just reports WouldBlock.
        let Some(conn) = self.connections.get_mut(&token) else {
            debug!(?token, "event for closed connection");
            return;
        };

        if readiness.error {
            if let Ok(Some(e)) | Err(e) = conn.stream_mut().take_error() {
                warn!(peer = %conn.peer(), error = %e, "Socket error on client connection");
                self.close(token);
                return;
            }
        }

        // a lone writable edge carries nothing to read
        if conn.is_reading() && !readiness.is_read_event() {
            return;
        }

        match conn.on_ready(&mut self.scratch) {
            Flow::Open => {}
            Flow::AwaitWritable => {
                let interest = Interest::READABLE | Interest::WRITABLE;
                if let Err(e) = self.multiplexer.reregister(conn.stream_mut(), token, interest) {
                    warn!(peer = %conn.peer(), error = %e, "Failed to wait for writable");
                    self.close(token);
                }
            }
            Flow::Close => self.close(token),
        }
    }

    fn close(&mut self, token: Token) {
        let Some(mut conn) = self.connections.remove(&token) else {
            return;
        };
        if let Err(e) = self.multiplexer.deregister(conn.stream_mut(), token) {
            warn!(
                peer = %conn.peer(),
                error = %e,
                "Failed to remove client socket from multiplexer"
            );
        }
        debug!(peer = %conn.peer(), "Connection closed");
        // dropping `conn` closes the descriptor
    }

    fn next_timeout(&self, now: Instant) -> Option<Duration> {
        let idle = self.config.idle_timeout?;
        self.connections
            .values()
            .map(|conn| conn.deadline(idle).saturating_duration_since(now))
            .min()
    }

    fn expire_idle(&mut self, now: Instant) {
        let Some(idle) = self.config.idle_timeout else {
            return;
        };

        let expired: Vec<Token> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.deadline(idle) <= now)
            .map(|(token, _)| *token)
            .collect();

        for token in expired {
            if let Some(conn) = self.connections.get(&token) {
                info!(peer = %conn.peer(), "Closing idle connection");
            }
            self.close(token);
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        let tokens: Vec<Token> = self.connections.keys().copied().collect();
        for token in tokens {
            self.close(token);
        }
        if let Err(e) = self.multiplexer.deregister(&mut self.listener, LISTENER) {
            debug!(error = %e, "Failed to deregister listener");
        }
    }
}
