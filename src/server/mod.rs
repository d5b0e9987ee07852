//! Socket plumbing and the event loop that drives it.

pub mod event_loop;
pub mod listener;
pub mod poller;

pub use event_loop::{EventLoop, ShutdownHandle};
