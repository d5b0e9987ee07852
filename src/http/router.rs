//! Maps a request path to the bytes sent back.
//!
//! This is the one place routes are added. It must stay free of I/O so it
//! can be exercised without sockets.

use bytes::Bytes;

use crate::http::response::{Response, StatusCode};
use crate::http::writer::serialize_response;

pub const ROOT_PATH: &str = "/";

pub const OK_BODY: &str = "<html><body><h1>Hello, Web Server With Epoll!!!</h1></body></html>";
pub const NOT_FOUND_BODY: &str = "<html><body><h1>404 Not Found</h1></body></html>";

/// A fully serialized response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingResult {
    pub status: StatusCode,
    pub bytes: Bytes,
}

impl RoutingResult {
    fn from_response(response: &Response) -> Self {
        Self {
            status: response.status,
            bytes: serialize_response(response),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// `None` means the request line could not be parsed.
pub fn route(path: Option<&str>) -> RoutingResult {
    match path {
        Some(ROOT_PATH) => ok(),
        _ => not_found(),
    }
}

pub fn ok() -> RoutingResult {
    RoutingResult::from_response(&Response::html(StatusCode::Ok, OK_BODY))
}

pub fn not_found() -> RoutingResult {
    RoutingResult::from_response(&Response::html(StatusCode::NotFound, NOT_FOUND_BODY))
}
