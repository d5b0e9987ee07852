use epoll_responder::http::parser::{ParseError, ParseState, parse_request_path};

#[test]
fn test_parse_simple_get_request() {
    let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

    assert_eq!(parse_request_path(req).unwrap(), "/");
}

#[test]
fn test_parse_request_with_path_and_query_string() {
    let req = b"GET /search?q=rust HTTP/1.1\r\nHost: example.com\r\n\r\n";

    assert_eq!(parse_request_path(req).unwrap(), "/search?q=rust");
}

#[test]
fn test_parse_ignores_method_token() {
    // the leading token is never validated
    let req = b"BREW /pot HTTP/1.1\r\n\r\n";

    assert_eq!(parse_request_path(req).unwrap(), "/pot");
}

#[test]
fn test_parse_needs_only_two_spaces() {
    assert_eq!(parse_request_path(b"x / ").unwrap(), "/");
    assert_eq!(parse_request_path(b"GET  HTTP/1.1").unwrap(), "");
}

#[test]
fn test_parse_path_stops_at_next_space() {
    let req = b"GET /a b HTTP/1.1\r\n\r\n";

    assert_eq!(parse_request_path(req).unwrap(), "/a");
}

#[test]
fn test_parse_without_any_space_is_incomplete() {
    for input in [&b""[..], &b"x"[..], &b"GET"[..], &b"GET/HTTP/1.1\r\n"[..]] {
        assert_eq!(parse_request_path(input), Err(ParseError::Incomplete));
    }
}

#[test]
fn test_parse_with_one_space_is_incomplete() {
    assert_eq!(parse_request_path(b"GET /missing"), Err(ParseError::Incomplete));
    assert_eq!(parse_request_path(b" "), Err(ParseError::Incomplete));
}

#[test]
fn test_parse_finished_header_block_without_path_is_malformed() {
    assert_eq!(parse_request_path(b"garbage\r\n\r\n"), Err(ParseError::Malformed));
    assert_eq!(parse_request_path(b"GET /\r\n\r\n"), Err(ParseError::Malformed));
}

#[test]
fn test_parse_is_total_over_short_inputs() {
    // every byte sequence of length <= 2 over an alphabet that includes
    // space, CR and LF must come back without panicking
    let alphabet = [b' ', b'\r', b'\n', b'G', 0xff];
    for &a in &alphabet {
        for &b in &alphabet {
            let _ = parse_request_path(&[a]);
            let _ = parse_request_path(&[a, b]);
        }
    }
}

#[test]
fn test_parse_non_utf8_path_is_lossy() {
    let req = b"GET /\xff HTTP/1.1\r\n\r\n";

    assert_eq!(parse_request_path(req).unwrap(), "/\u{fffd}");
}

#[test]
fn test_parse_state_for_split_request() {
    let mut buf = b"GET /mis".to_vec();
    assert_eq!(ParseState::from_buffer(&buf), ParseState::AwaitingRequestLine);

    buf.extend_from_slice(b"sing HTTP/1.1\r\n\r\n");
    assert_eq!(
        ParseState::from_buffer(&buf),
        ParseState::HaveCompletePath("/missing".to_string())
    );
}
