//! Thin layer over `mio::Poll`.
//!
//! mio registrations are edge-triggered on every backend, so whoever
//! handles a readiness event has to drain the source until it would block.
//! The multiplexer also keeps the set of live tokens, which makes a double
//! registration or a stale deregistration an error instead of silent
//! kernel state.

use std::collections::HashSet;
use std::io;
use std::time::Duration;

use mio::event::Source;
use mio::{Events, Interest, Poll, Token, Waker};

/// One ready descriptor, copied out of the event batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub token: Token,
    pub readable: bool,
    pub writable: bool,
    /// Peer closed its side, or the socket was hung up
    pub closed: bool,
    pub error: bool,
}

impl Readiness {
    /// Whether a read could make progress: data, EOF or a pending error.
    pub fn is_read_event(&self) -> bool {
        self.readable || self.closed || self.error
    }
}

pub struct Multiplexer {
    poll: Poll,
    events: Events,
    registered: HashSet<Token>,
}

impl Multiplexer {
    pub fn new(max_events: usize) -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            events: Events::with_capacity(max_events.max(1)),
            registered: HashSet::new(),
        })
    }

    pub fn register<S>(
        &mut self,
        source: &mut S,
        token: Token,
        interest: Interest,
    ) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        if self.registered.contains(&token) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{token:?} is already registered"),
            ));
        }
        self.poll.registry().register(source, token, interest)?;
        self.registered.insert(token);
        Ok(())
    }

    pub fn reregister<S>(
        &mut self,
        source: &mut S,
        token: Token,
        interest: Interest,
    ) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        if !self.registered.contains(&token) {
            return Err(not_registered(token));
        }
        self.poll.registry().reregister(source, token, interest)
    }

    /// Must run before the source is dropped.
    pub fn deregister<S>(&mut self, source: &mut S, token: Token) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        if !self.registered.remove(&token) {
            return Err(not_registered(token));
        }
        self.poll.registry().deregister(source)
    }

    /// A waker whose wake-ups surface as readable events on `token`.
    pub fn waker(&mut self, token: Token) -> io::Result<Waker> {
        if self.registered.contains(&token) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{token:?} is already registered"),
            ));
        }
        let waker = Waker::new(self.poll.registry(), token)?;
        self.registered.insert(token);
        Ok(waker)
    }

    pub fn is_registered(&self, token: Token) -> bool {
        self.registered.contains(&token)
    }

    pub fn registrations(&self) -> usize {
        self.registered.len()
    }

    /// Blocks until something is ready or `timeout` passes (`None` blocks
    /// indefinitely). EINTR is retried. `out` is cleared and refilled in
    /// the order the kernel reported.
    pub fn wait(&mut self, timeout: Option<Duration>, out: &mut Vec<Readiness>) -> io::Result<()> {
        loop {
            match self.poll.poll(&mut self.events, timeout) {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        out.clear();
        out.extend(self.events.iter().map(|event| Readiness {
            token: event.token(),
            readable: event.is_readable(),
            writable: event.is_writable(),
            closed: event.is_read_closed() || event.is_write_closed(),
            error: event.is_error(),
        }));
        Ok(())
    }
}

fn not_registered(token: Token) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{token:?} is not registered"))
}
