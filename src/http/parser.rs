#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than two spaces so far; more bytes may complete the line
    Incomplete,
    /// The header block ended without two spaces; it can never complete
    Malformed,
}

/// What a connection knows about its request after the last read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseState {
    AwaitingRequestLine,
    HaveCompletePath(String),
    Malformed,
}

impl ParseState {
    pub fn from_buffer(buf: &[u8]) -> Self {
        match parse_request_path(buf) {
            Ok(path) => ParseState::HaveCompletePath(path),
            Err(ParseError::Incomplete) => ParseState::AwaitingRequestLine,
            Err(ParseError::Malformed) => ParseState::Malformed,
        }
    }
}

const HEADERS_END: &[u8] = b"\r\n\r\n";

/// Extracts the request path: the bytes strictly between the first space
/// and the next one.
///
/// The leading token is taken as the method and ignored; nothing after the
/// second space is looked at. Invalid UTF-8 in the path is replaced lossily.
pub fn parse_request_path(buf: &[u8]) -> Result<String, ParseError> {
    let Some(first) = buf.iter().position(|&b| b == b' ') else {
        return Err(incomplete_or_malformed(buf));
    };

    let rest = &buf[first + 1..];
    let Some(len) = rest.iter().position(|&b| b == b' ') else {
        return Err(incomplete_or_malformed(buf));
    };

    Ok(String::from_utf8_lossy(&rest[..len]).into_owned())
}

fn incomplete_or_malformed(buf: &[u8]) -> ParseError {
    if find_headers_end(buf).is_some() {
        ParseError::Malformed
    } else {
        ParseError::Incomplete
    }
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADERS_END.len())
        .position(|w| w == HEADERS_END)
}
