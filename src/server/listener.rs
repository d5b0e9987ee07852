use std::io;
use std::net::SocketAddr;

use mio::net::{TcpListener, TcpStream};
use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{Result, ServerError};

/// Outcome of a single non-blocking accept.
#[derive(Debug)]
pub enum Accept {
    Connection(TcpStream, SocketAddr),
    /// No pending connection left in the backlog
    WouldBlock,
}

/// Creates the listening socket: SO_REUSEADDR, bind, listen, non-blocking.
pub fn create_listener(addr: SocketAddr, backlog: i32) -> Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket =
        Socket::new(domain, Type::STREAM, Some(Protocol::TCP)).map_err(ServerError::Socket)?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true).map_err(ServerError::Socket)?;

    socket
        .bind(&addr.into())
        .map_err(|source| ServerError::Bind { addr, source })?;

    socket
        .listen(backlog)
        .map_err(|source| ServerError::Listen { source })?;

    set_nonblocking(&socket).map_err(ServerError::Socket)?;

    Ok(TcpListener::from_std(socket.into()))
}

/// Must run before a socket takes part in readiness-based I/O; a blocking
/// call would stall every other connection on the loop.
pub fn set_nonblocking(socket: &Socket) -> io::Result<()> {
    socket.set_nonblocking(true)
}

/// Accepts at most one pending connection.
///
/// Streams returned by mio are already non-blocking (accept4 with
/// SOCK_NONBLOCK on Linux).
pub fn accept_one(listener: &TcpListener) -> io::Result<Accept> {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => return Ok(Accept::Connection(stream, peer)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Accept::WouldBlock),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Accept failures that will repeat until some descriptor or buffer is
/// released. Anything else only concerns the connection being accepted.
pub fn is_resource_exhausted(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_exhaustion_stops_accepting() {
        assert!(is_resource_exhausted(&io::Error::from_raw_os_error(libc::EMFILE)));
        assert!(is_resource_exhausted(&io::Error::from_raw_os_error(libc::ENFILE)));
        assert!(is_resource_exhausted(&io::Error::from_raw_os_error(libc::ENOBUFS)));
        assert!(is_resource_exhausted(&io::Error::from_raw_os_error(libc::ENOMEM)));
    }

    #[test]
    fn aborted_handshake_does_not_stop_accepting() {
        assert!(!is_resource_exhausted(&io::Error::from_raw_os_error(libc::ECONNABORTED)));
        assert!(!is_resource_exhausted(&io::Error::from_raw_os_error(libc::EPROTO)));
        assert!(!is_resource_exhausted(&io::Error::from(io::ErrorKind::ConnectionAborted)));
    }

    #[test]
    fn accept_without_pending_client_would_block() {
        let listener = create_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();

        assert!(matches!(accept_one(&listener).unwrap(), Accept::WouldBlock));
    }

    #[test]
    fn second_bind_to_same_port_fails() {
        let first = create_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = first.local_addr().unwrap();

        let err = create_listener(addr, 16).unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
