//! Epoll Responder - single-threaded, edge-triggered HTTP responder
//!
//! Core library: readiness multiplexing, connection lifecycle and routing.

pub mod config;
pub mod error;
pub mod http;
pub mod server;
