use std::io::{self, Read};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use mio::net::TcpStream;
use tracing::{debug, warn};

use crate::http::parser::ParseState;
use crate::http::router;
use crate::http::writer::{ResponseWriter, WriteStatus};

/// One accepted client. Serves a single request, then closes.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    buffer: BytesMut,
    parse: ParseState,
    state: ConnectionState,
    max_request_bytes: usize,
    last_activity: Instant,
}

#[derive(Debug)]
pub enum ConnectionState {
    Reading,
    Parsed,
    Responding(ResponseWriter),
    Closed,
}

/// What the event loop has to do with the connection after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep the current registration and wait
    Open,
    /// A response is half-written; the loop must add writable interest
    AwaitWritable,
    /// Deregister and drop
    Close,
}

enum Drain {
    /// Socket reported WouldBlock; peer still connected
    Exhausted,
    /// Peer sent FIN
    Eof,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, max_request_bytes: usize) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(1024),
            parse: ParseState::AwaitingRequestLine,
            state: ConnectionState::Reading,
            max_request_bytes,
            last_activity: Instant::now(),
        }
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn parse_state(&self) -> &ParseState {
        &self.parse
    }

    pub fn deadline(&self, idle_timeout: Duration) -> Instant {
        self.last_activity + idle_timeout
    }

    /// Drives the state machine as far as the socket allows.
    ///
    /// `scratch` is the buffer each read call fills before the bytes are
    /// appended to the connection's own buffer.
    pub fn on_ready(&mut self, scratch: &mut [u8]) -> Flow {
        loop {
            match &mut self.state {
                ConnectionState::Reading => match self.read_request(scratch) {
                    Some(next) => self.state = next,
                    None => return Flow::Open,
                },

                ConnectionState::Parsed => {
                    let path = match &self.parse {
                        ParseState::HaveCompletePath(path) => Some(path.as_str()),
                        _ => None,
                    };
                    let result = router::route(path);
                    debug!(
                        peer = %self.peer,
                        path = ?path,
                        status = result.status.as_u16(),
                        "routed request"
                    );

                    self.state = ConnectionState::Responding(ResponseWriter::new(result.bytes));
                }

                ConnectionState::Responding(writer) => match writer.write_to(&mut self.stream) {
                    Ok(WriteStatus::Complete) => {
                        self.state = ConnectionState::Closed;
                    }
                    Ok(WriteStatus::Blocked) => {
                        debug!(
                            peer = %self.peer,
                            remaining = writer.remaining(),
                            "socket full, waiting for writable"
                        );
                        return Flow::AwaitWritable;
                    }
                    Err(e) => {
                        warn!(peer = %self.peer, error = %e, "failed to send response to client");
                        self.state = ConnectionState::Closed;
                    }
                },

                ConnectionState::Closed => return Flow::Close,
            }
        }
    }

    /// Returns the next state, or `None` to keep waiting for bytes.
    fn read_request(&mut self, scratch: &mut [u8]) -> Option<ConnectionState> {
        let drain = match self.drain(scratch) {
            Ok(drain) => drain,
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "failed to read data from client");
                return Some(ConnectionState::Closed);
            }
        };

        match (&self.parse, drain) {
            (ParseState::HaveCompletePath(_) | ParseState::Malformed, _) => {
                Some(ConnectionState::Parsed)
            }
            (ParseState::AwaitingRequestLine, _) if self.over_limit() => {
                warn!(
                    peer = %self.peer,
                    buffered = self.buffer.len(),
                    limit = self.max_request_bytes,
                    "request line exceeds size limit, closing"
                );
                Some(ConnectionState::Closed)
            }
            (ParseState::AwaitingRequestLine, Drain::Eof) => {
                debug!(peer = %self.peer, "client disconnected");
                Some(ConnectionState::Closed)
            }
            (ParseState::AwaitingRequestLine, Drain::Exhausted) => None,
        }
    }

    pub fn is_reading(&self) -> bool {
        matches!(self.state, ConnectionState::Reading)
    }

    fn over_limit(&self) -> bool {
        self.buffer.len() > self.max_request_bytes
    }

    /// Reads until the socket would block. Readiness is edge-triggered, so
    /// stopping early would strand whatever is left in the kernel buffer.
    ///
    /// Only bytes up to the end of the request line are kept; the rest of
    /// the request is read and dropped so it never counts against the limit.
    fn drain(&mut self, scratch: &mut [u8]) -> io::Result<Drain> {
        loop {
            match self.stream.read(scratch) {
                Ok(0) => return Ok(Drain::Eof),
                Ok(n) => {
                    self.last_activity = Instant::now();
                    if self.parse != ParseState::AwaitingRequestLine {
                        continue;
                    }
                    self.buffer.extend_from_slice(&scratch[..n]);
                    self.parse = ParseState::from_buffer(&self.buffer);
                    if self.parse == ParseState::AwaitingRequestLine && self.over_limit() {
                        return Ok(Drain::Exhausted);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Drain::Exhausted),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream as StdStream};
    use std::thread;

    fn pair(max_request_bytes: usize) -> (Connection, StdStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = StdStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, peer) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();

        let conn = Connection::new(TcpStream::from_std(server), peer, max_request_bytes);
        (conn, client)
    }

    /// Loopback delivery is fast but not synchronous; give it a few tries.
    fn drive_until(conn: &mut Connection, want: Flow) -> Flow {
        let mut scratch = [0u8; 16];
        let mut flow = conn.on_ready(&mut scratch);
        for _ in 0..50 {
            if flow == want {
                break;
            }
            thread::sleep(Duration::from_millis(10));
            flow = conn.on_ready(&mut scratch);
        }
        flow
    }

    #[test]
    fn partial_request_keeps_reading() {
        let (mut conn, mut client) = pair(1024);

        client.write_all(b"GET /x").unwrap();
        thread::sleep(Duration::from_millis(50));
        let mut scratch = [0u8; 4];

        assert_eq!(conn.on_ready(&mut scratch), Flow::Open);
        assert!(matches!(conn.state(), ConnectionState::Reading));
        assert_eq!(conn.parse_state(), &ParseState::AwaitingRequestLine);
    }

    #[test]
    fn full_request_is_answered_and_closed() {
        let (mut conn, mut client) = pair(1024);

        client.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();

        assert_eq!(drive_until(&mut conn, Flow::Close), Flow::Close);
        assert!(matches!(conn.state(), ConnectionState::Closed));
        assert_eq!(conn.parse_state(), &ParseState::HaveCompletePath("/".to_string()));
    }

    #[test]
    fn buffer_over_limit_closes() {
        let (mut conn, mut client) = pair(8);

        client.write_all(b"AAAAAAAAAAAAAAAAAAAA").unwrap();

        assert_eq!(drive_until(&mut conn, Flow::Close), Flow::Close);
    }

    #[test]
    fn long_headers_after_request_line_are_answered() {
        let (mut conn, mut client) = pair(64);

        let mut request = b"GET / HTTP/1.1\r\nCookie: ".to_vec();
        request.extend_from_slice(&[b'a'; 4096]);
        request.extend_from_slice(b"\r\n\r\n");
        client.write_all(&request).unwrap();

        assert_eq!(drive_until(&mut conn, Flow::Close), Flow::Close);
        assert_eq!(conn.parse_state(), &ParseState::HaveCompletePath("/".to_string()));
        assert!(conn.buffer.len() <= 64 + 16);
    }

    #[test]
    fn eof_without_request_closes() {
        let (mut conn, client) = pair(1024);
        drop(client);

        assert_eq!(drive_until(&mut conn, Flow::Close), Flow::Close);
        assert_eq!(conn.parse_state(), &ParseState::AwaitingRequestLine);
    }
}
