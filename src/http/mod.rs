//! HTTP side of the responder.
//!
//! - **`connection`**: per-client state machine driven by readiness events
//! - **`parser`**: extracts the request path from buffered bytes
//! - **`router`**: maps a path to a serialized response
//! - **`response`**: response representation with builder pattern
//! - **`writer`**: serialization and resumable non-blocking writes
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← drain socket, wait for two spaces
//!        └──────┬──────┘
//!               │ path found, or header block without one
//!               ▼
//!        ┌──────────────────┐
//!        │     Parsed       │ ← route
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │   Responding     │ ← write, resumes on writable
//!        └──────┬───────────┘
//!               ▼
//!            Closed
//! ```
//!
//! There is no keep-alive: every connection carries one request.

pub mod connection;
pub mod parser;
pub mod response;
pub mod router;
pub mod writer;
