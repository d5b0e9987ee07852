use std::io::{self, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

pub fn serialize_response(resp: &Response) -> Bytes {
    let mut buf = BytesMut::with_capacity(128 + resp.body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.put_slice(status_line.as_bytes());

    for (k, v) in &resp.headers {
        buf.put_slice(k.as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(v.as_bytes());
        buf.put_slice(b"\r\n");
    }

    buf.put_slice(b"\r\n");
    buf.put_slice(&resp.body);

    buf.freeze()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Every byte has been handed to the socket
    Complete,
    /// The socket buffer is full; retry on the next writable event
    Blocked,
}

/// Tracks how much of a serialized response has reached a non-blocking
/// socket, so a short write can resume where it stopped.
#[derive(Debug)]
pub struct ResponseWriter {
    buffer: Bytes,
    written: usize,
}

impl ResponseWriter {
    pub fn new(buffer: Bytes) -> Self {
        Self { buffer, written: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.written
    }

    pub fn write_to<W: Write>(&mut self, stream: &mut W) -> io::Result<WriteStatus> {
        while self.written < self.buffer.len() {
            match stream.write(&self.buffer[self.written..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "connection closed while writing",
                    ));
                }
                Ok(n) => self.written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(WriteStatus::Blocked);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(WriteStatus::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts at most `cap` bytes per call, then reports WouldBlock once.
    struct Trickle {
        out: Vec<u8>,
        cap: usize,
        block_next: bool,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.block_next {
                self.block_next = false;
                return Err(io::ErrorKind::WouldBlock.into());
            }
            self.block_next = true;
            let n = buf.len().min(self.cap);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn resumes_after_short_write() {
        let mut writer = ResponseWriter::new(Bytes::from_static(b"hello world"));
        let mut sink = Trickle {
            out: Vec::new(),
            cap: 4,
            block_next: false,
        };

        assert_eq!(writer.write_to(&mut sink).unwrap(), WriteStatus::Blocked);
        assert_eq!(writer.remaining(), 7);

        let mut status = WriteStatus::Blocked;
        while status == WriteStatus::Blocked {
            status = writer.write_to(&mut sink).unwrap();
        }

        assert_eq!(sink.out, b"hello world");
        assert_eq!(writer.remaining(), 0);
    }

    #[test]
    fn zero_length_write_is_an_error() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut writer = ResponseWriter::new(Bytes::from_static(b"x"));
        let err = writer.write_to(&mut Closed).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }
}
